// src/models/history.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_history' table.
/// Durable copy of a participant's final score, written when a session ends.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizHistory {
    pub id: i64,
    pub quiz_id: i64,
    pub player_name: String,
    pub score: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
