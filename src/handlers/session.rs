// src/handlers/session.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::{Config, RESULTS_TOP_N},
    error::AppError,
    handlers::{find_quiz, load_questions},
    models::{
        question::{PlayQuestion, QuestionWithChoices},
        taker::{
            AnswerReview, CheckAnswersResponse, JoinRequest, JoinResponse, Participant,
            QuizTaker, ScoreEntry, SubmitAnswersRequest, UserResponse,
        },
    },
    utils::{
        code::normalize_join_code,
        jwt::{MaybeClaims, ROLE_GUEST, sign_jwt},
    },
};

/// Finds the caller's taker record for a quiz: first by registered user, then
/// by the taker bound to a guest token.
async fn resolve_taker(
    pool: &SqlitePool,
    quiz_id: i64,
    caller: &MaybeClaims,
) -> Result<Option<QuizTaker>, AppError> {
    if let Some(user_id) = caller.user_id() {
        let taker = sqlx::query_as::<_, QuizTaker>(
            "SELECT id, quiz_id, user_id, alias, score FROM quiz_takers WHERE quiz_id = ? AND user_id = ?",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        if taker.is_some() {
            return Ok(taker);
        }
    }

    if let Some(taker_id) = caller.guest_taker_id() {
        let taker = sqlx::query_as::<_, QuizTaker>(
            "SELECT id, quiz_id, user_id, alias, score FROM quiz_takers WHERE id = ? AND quiz_id = ?",
        )
        .bind(taker_id)
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?;
        return Ok(taker);
    }

    Ok(None)
}

fn not_joined() -> AppError {
    AppError::Forbidden("Join the quiz session first".to_string())
}

fn alias_taken(alias: &str) -> AppError {
    AppError::Conflict(format!(
        "The name '{}' is already in this quiz. Please choose another.",
        alias
    ))
}

/// Joins a live session by join code.
///
/// * Registered users get (or reuse) their own taker record.
/// * Guests must pick an alias not already used in this session and receive
///   a guest token bound to their new taker record.
pub async fn join_session(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(caller): Extension<MaybeClaims>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let code = normalize_join_code(&payload.code);
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(AppError::BadRequest("Username is required".to_string()))?;

    let quiz = find_quiz(&pool, &code)
        .await
        .map_err(|_| AppError::NotFound("Invalid quiz code".to_string()))?;

    if let Some(user_id) = caller.user_id() {
        sqlx::query(
            r#"
            INSERT INTO quiz_takers (quiz_id, user_id, alias, score)
            VALUES (?, ?, ?, 0)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(quiz.id)
        .bind(user_id)
        .bind(username)
        .execute(&pool)
        .await?;

        let taker = resolve_taker(&pool, quiz.id, &caller)
            .await?
            .ok_or_else(|| AppError::InternalServerError("Taker vanished after insert".into()))?;

        tracing::info!("User {} joined quiz {} as {}", user_id, quiz.code, taker.alias);

        return Ok((
            StatusCode::OK,
            Json(JoinResponse {
                taker_id: taker.id,
                alias: taker.alias,
                quiz_code: quiz.code,
                token: None,
            }),
        ));
    }

    let alias_in_use: Option<i64> =
        sqlx::query_scalar("SELECT id FROM quiz_takers WHERE quiz_id = ? AND alias = ?")
            .bind(quiz.id)
            .bind(username)
            .fetch_optional(&pool)
            .await?;

    if alias_in_use.is_some() {
        return Err(alias_taken(username));
    }

    // the partial unique index settles races between concurrent guests
    let taker_id: i64 = sqlx::query_scalar(
        "INSERT INTO quiz_takers (quiz_id, user_id, alias, score) VALUES (?, NULL, ?, 0) RETURNING id",
    )
    .bind(quiz.id)
    .bind(username)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint") {
            alias_taken(username)
        } else {
            tracing::error!("Failed to add guest to quiz {}: {:?}", quiz.code, e);
            AppError::from(e)
        }
    })?;

    let token = sign_jwt(taker_id, ROLE_GUEST, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!("Guest {} joined quiz {}", username, quiz.code);

    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            taker_id,
            alias: username.to_string(),
            quiz_code: quiz.code,
            token: Some(token),
        }),
    ))
}

/// Questions for a participant, without the answers.
/// The owner may preview without joining.
pub async fn play(
    State(pool): State<SqlitePool>,
    Extension(caller): Extension<MaybeClaims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let taker = resolve_taker(&pool, quiz.id, &caller).await?;
    let is_owner = caller.user_id() == Some(quiz.owner_id);

    if taker.is_none() && !is_owner {
        return Err(not_joined());
    }

    let questions = load_questions(&pool, quiz.id).await?;
    let questions: Vec<PlayQuestion> = questions.iter().map(PlayQuestion::from).collect();

    Ok(Json(json!({
        "quiz": { "title": quiz.title, "code": quiz.code },
        "quiz_taker": taker,
        "questions": questions,
    })))
}

/// Scores a submission against the quiz.
///
/// Only answers whose choice belongs to the answered question are kept.
/// Returns the accepted `(question_id, choice_id)` pairs and the total of the
/// marks of correct ones.
pub(crate) fn score_submission(
    questions: &[QuestionWithChoices],
    answers: &HashMap<i64, i64>,
) -> (i64, Vec<(i64, i64)>) {
    let mut score = 0;
    let mut accepted = Vec::new();

    for q in questions {
        let Some(choice_id) = answers.get(&q.question.id) else {
            continue;
        };
        let Some(choice) = q.choices.iter().find(|c| c.id == *choice_id) else {
            tracing::debug!("Choice {} does not belong to question {}", choice_id, q.question.id);
            continue;
        };

        accepted.push((q.question.id, choice.id));
        if choice.is_correct {
            score += q.question.marks;
        }
    }

    (score, accepted)
}

/// Submits answers for the caller's taker record.
///
/// Replaces any earlier responses and recomputes the score from scratch.
pub async fn submit_answers(
    State(pool): State<SqlitePool>,
    Extension(caller): Extension<MaybeClaims>,
    Path(code): Path<String>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let taker = resolve_taker(&pool, quiz.id, &caller)
        .await?
        .ok_or_else(not_joined)?;

    let questions = load_questions(&pool, quiz.id).await?;
    let (score, accepted) = score_submission(&questions, &payload.answers);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM user_responses WHERE quiz_taker_id = ?")
        .bind(taker.id)
        .execute(&mut *tx)
        .await?;

    for &(question_id, choice_id) in &accepted {
        sqlx::query(
            "INSERT INTO user_responses (quiz_taker_id, question_id, selected_choice_id) VALUES (?, ?, ?)",
        )
        .bind(taker.id)
        .bind(question_id)
        .bind(choice_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE quiz_takers SET score = ? WHERE id = ?")
        .bind(score)
        .bind(taker.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to store submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("{} scored {} on quiz {}", taker.alias, score, quiz.code);

    Ok(Json(json!({
        "score": score,
        "answered": accepted.len(),
        "total_questions": questions.len(),
    })))
}

/// Results board. The owner sees everyone; others see the top 5.
pub async fn results(
    State(pool): State<SqlitePool>,
    Extension(caller): Extension<MaybeClaims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let limit = if caller.user_id() == Some(quiz.owner_id) {
        -1
    } else {
        RESULTS_TOP_N
    };

    let entries = sqlx::query_as::<_, ScoreEntry>(
        r#"
        SELECT alias AS username, score
        FROM quiz_takers
        WHERE quiz_id = ?
        ORDER BY score DESC, id ASC
        LIMIT ?
        "#,
    )
    .bind(quiz.id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "quiz": { "title": quiz.title, "code": quiz.code },
        "quiz_takers": entries,
    })))
}

/// Per-question review of the caller's last submission.
pub async fn check_answers(
    State(pool): State<SqlitePool>,
    Extension(caller): Extension<MaybeClaims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let taker = resolve_taker(&pool, quiz.id, &caller)
        .await?
        .ok_or_else(not_joined)?;

    let selected: HashMap<i64, Option<i64>> = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, quiz_taker_id, question_id, selected_choice_id
        FROM user_responses
        WHERE quiz_taker_id = ?
        "#,
    )
    .bind(taker.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|response| (response.question_id, response.selected_choice_id))
    .collect();

    let review = load_questions(&pool, quiz.id)
        .await?
        .into_iter()
        .map(|q| {
            let selected_choice_id = selected.get(&q.question.id).copied().flatten();
            let is_correct = selected_choice_id
                .and_then(|id| q.choices.iter().find(|c| c.id == id))
                .is_some_and(|c| c.is_correct);

            AnswerReview {
                question: q.question,
                choices: q.choices,
                selected_choice_id,
                is_correct,
            }
        })
        .collect();

    Ok(Json(CheckAnswersResponse {
        score: taker.score,
        review,
    }))
}

/// Number of participants currently in the session.
pub async fn live_count(
    State(pool): State<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_takers WHERE quiz_id = ?")
        .bind(quiz.id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "live_count": count })))
}

pub async fn live_scoreboard(
    State(pool): State<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let entries = sqlx::query_as::<_, ScoreEntry>(
        "SELECT alias AS username, score FROM quiz_takers WHERE quiz_id = ? ORDER BY score DESC, id ASC",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

pub async fn live_participants(
    State(pool): State<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, &code).await?;
    let participants = sqlx::query_as::<_, Participant>(
        "SELECT alias AS username FROM quiz_takers WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(participants))
}
