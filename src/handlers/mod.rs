// src/handlers/mod.rs

pub mod ai;
pub mod auth;
pub mod quizzes;
pub mod session;

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::{Choice, Question, QuestionWithChoices},
        quiz::Quiz,
    },
};

/// Looks a quiz up by its join code.
pub(crate) async fn find_quiz(pool: &SqlitePool, code: &str) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        "SELECT id, owner_id, title, code, created_at, updated_at FROM quizzes WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", code)))
}

/// Rejects callers other than the quiz owner.
pub(crate) fn ensure_owner(quiz: &Quiz, user_id: i64) -> Result<(), AppError> {
    if quiz.owner_id != user_id {
        return Err(AppError::Forbidden(
            "Only the quiz owner can do this".to_string(),
        ));
    }
    Ok(())
}

/// Loads a quiz's questions, each with its choices, in authoring order.
pub(crate) async fn load_questions(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<QuestionWithChoices>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text, marks, duration, explanation FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.id, c.question_id, c.text, c.is_correct
        FROM choices c
        JOIN questions q ON c.question_id = q.id
        WHERE q.quiz_id = ?
        ORDER BY c.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(questions
        .into_iter()
        .map(|question| {
            let choices = choices
                .iter()
                .filter(|c| c.question_id == question.id)
                .cloned()
                .collect();
            QuestionWithChoices { question, choices }
        })
        .collect())
}
