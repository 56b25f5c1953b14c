// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::question::{CreateQuestionRequest, QuestionWithChoices};
use super::taker::QuizTaker;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,

    /// 6 character join code participants type in.
    pub code: String,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Bumped whenever a session ends, so recently used quizzes list first.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Owner's quiz list.
#[derive(Debug, Serialize)]
pub struct QuizListResponse {
    pub quiz_count: usize,
    pub quizzes: Vec<Quiz>,
}

/// Everything the quiz master sees while running a session.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithChoices>,
    pub quiz_takers: Vec<QuizTaker>,
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters."))]
    pub title: String,

    #[validate(length(min = 1, message = "A quiz needs at least one question."), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

#[derive(Debug, Serialize)]
pub struct CreateQuizResponse {
    pub id: i64,
    pub code: String,
}
