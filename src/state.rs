use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::ai::{llm::TextGenerator, QuizGenerator};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    /// Handle to the local text-generation model, shared by chat and generation.
    pub llm: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, llm: Arc<dyn TextGenerator>) -> Self {
        Self { pool, config, llm }
    }

    pub fn quiz_generator(&self) -> QuizGenerator {
        QuizGenerator::new(self.llm.clone())
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
