use rand::Rng;
use sqlx::SqlitePool;

use crate::error::AppError;

pub const JOIN_CODE_LEN: usize = 6;

const JOIN_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random 6 character upper-case alphanumeric code.
pub fn random_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_CHARSET[rng.gen_range(0..JOIN_CODE_CHARSET.len())] as char)
        .collect()
}

/// Draws codes until one is not used by any quiz.
pub async fn unique_join_code(pool: &SqlitePool) -> Result<String, AppError> {
    loop {
        let code = random_join_code();
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE code = ?")
            .bind(&code)
            .fetch_optional(pool)
            .await?;

        if taken.is_none() {
            return Ok(code);
        }
        tracing::debug!("join code {} already taken, drawing again", code);
    }
}

/// Normalizes a code typed by a participant: trims it and drops curly quotes
/// that phones like to insert.
pub fn normalize_join_code(raw: &str) -> String {
    raw.trim().replace(['\u{201c}', '\u{201d}'], "")
}
