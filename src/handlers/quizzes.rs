// src/handlers/quizzes.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{ensure_owner, find_quiz, load_questions},
    models::{
        history::QuizHistory,
        quiz::{CreateQuizRequest, CreateQuizResponse, DashboardResponse, Quiz, QuizListResponse},
        taker::QuizTaker,
    },
    utils::{code::unique_join_code, jwt::Claims},
};

/// Lists the caller's quizzes, most recently used first.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, owner_id, title, code, created_at, updated_at
        FROM quizzes
        WHERE owner_id = ?
        ORDER BY updated_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(QuizListResponse {
        quiz_count: quizzes.len(),
        quizzes,
    }))
}

/// Creates a quiz with its questions and choices and opens it for joining.
///
/// * Assigns a fresh join code.
/// * Skips blank options; `correct_option` refers to the submitted position.
/// * Stores text verbatim apart from trimming. Clients escape on render.
/// * Runs in one transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    payload.validate()?;

    let code = unique_join_code(&pool).await?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (owner_id, title, code, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(payload.title.trim())
    .bind(&code)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for question in &payload.questions {
        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (quiz_id, text, marks, duration, explanation)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(question.text.trim())
        .bind(question.marks)
        .bind(question.duration)
        .bind(question.explanation.as_deref().map(str::trim))
        .fetch_one(&mut *tx)
        .await?;

        for (position, option) in question.options.iter().enumerate() {
            if option.trim().is_empty() {
                continue;
            }
            let is_correct = question.correct_option == Some(position + 1);

            sqlx::query("INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?)")
                .bind(question_id)
                .bind(option.trim())
                .bind(is_correct)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        "Quiz {} created by user {} with {} questions",
        code,
        user_id,
        payload.questions.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateQuizResponse { id: quiz_id, code }),
    ))
}

/// Quiz master dashboard: questions with answers and the live participants.
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    ensure_owner(&quiz, claims.user_id()?)?;

    let questions = load_questions(&pool, quiz.id).await?;
    let quiz_takers = sqlx::query_as::<_, QuizTaker>(
        "SELECT id, quiz_id, user_id, alias, score FROM quiz_takers WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(DashboardResponse {
        quiz,
        questions,
        quiz_takers,
    }))
}

/// Deletes a quiz and everything hanging off it.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    ensure_owner(&quiz, claims.user_id()?)?;

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("Quiz {} deleted", quiz.code);

    Ok(StatusCode::NO_CONTENT)
}

/// Ends the live session.
///
/// Archives every current taker into `quiz_history`, then deletes the takers
/// and their responses so the quiz can be run again. Atomic.
pub async fn end_session(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    ensure_owner(&quiz, claims.user_id()?)?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let takers = sqlx::query_as::<_, QuizTaker>(
        "SELECT id, quiz_id, user_id, alias, score FROM quiz_takers WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz.id)
    .fetch_all(&mut *tx)
    .await?;

    for taker in &takers {
        tracing::debug!("Archiving player {} with score {}", taker.alias, taker.score);
        sqlx::query(
            "INSERT INTO quiz_history (quiz_id, player_name, score, completed_at) VALUES (?, ?, ?, ?)",
        )
        .bind(quiz.id)
        .bind(&taker.alias)
        .bind(taker.score)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE quizzes SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(quiz.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "DELETE FROM user_responses WHERE quiz_taker_id IN (SELECT id FROM quiz_takers WHERE quiz_id = ?)",
    )
    .bind(quiz.id)
    .execute(&mut *tx)
    .await?;

    let cleared = sqlx::query("DELETE FROM quiz_takers WHERE quiz_id = ?")
        .bind(quiz.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to end session for quiz {}: {:?}", quiz.code, e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Session for quiz {} ended: {} archived, {} cleared",
        quiz.code,
        takers.len(),
        cleared
    );

    Ok(Json(serde_json::json!({
        "archived": takers.len(),
        "quiz_code": quiz.code,
    })))
}

/// Archived results of past sessions, newest first.
pub async fn history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    ensure_owner(&quiz, claims.user_id()?)?;

    let history = sqlx::query_as::<_, QuizHistory>(
        r#"
        SELECT id, quiz_id, player_name, score, completed_at
        FROM quiz_history
        WHERE quiz_id = ?
        ORDER BY completed_at DESC, id DESC
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(history))
}

pub async fn delete_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    ensure_owner(&quiz, claims.user_id()?)?;

    sqlx::query("DELETE FROM quiz_history WHERE quiz_id = ?")
        .bind(quiz.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
