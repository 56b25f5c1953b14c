// src/models/taker.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::question::{Choice, Question};

/// Represents the 'quiz_takers' table: one live participant of a session.
/// `user_id` is `None` for guests.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizTaker {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: Option<i64>,
    pub alias: String,
    pub score: i64,
}

/// Represents the 'user_responses' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub quiz_taker_id: i64,
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
}

/// DTO for joining a live session.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub taker_id: i64,
    pub alias: String,
    pub quiz_code: String,
    /// Only issued to guests; registered users keep using their login token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// DTO for submitting answers.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Key: question ID. Value: selected choice ID.
    pub answers: HashMap<i64, i64>,
}

/// Row of the live scoreboard and results board.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct ScoreEntry {
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Participant {
    pub username: String,
}

/// Per-question feedback shown after submitting.
#[derive(Debug, Serialize)]
pub struct AnswerReview {
    pub question: Question,
    pub choices: Vec<Choice>,
    pub selected_choice_id: Option<i64>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckAnswersResponse {
    pub score: i64,
    pub review: Vec<AnswerReview>,
}
