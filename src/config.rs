// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Upper bound for the number of questions a single generation request may ask for.
pub const MAX_GENERATED_QUESTIONS: usize = 200;

/// Question count used when the request does not carry a usable one.
pub const DEFAULT_GENERATED_QUESTIONS: usize = 5;

/// Number of participants shown to non-owners on the results board.
pub const RESULTS_TOP_N: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    /// Base URL of the Ollama-compatible inference server.
    pub ollama_url: Url,
    pub ollama_model: String,
    /// Path or name of the tesseract binary used for image OCR.
    pub tesseract_cmd: String,
    pub ocr_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quizmania.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let ollama_url = env::var("OLLAMA_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        let ollama_url = Url::parse(&ollama_url).expect("OLLAMA_URL must be a valid URL");

        let ollama_model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:3b".to_string());

        let tesseract_cmd = env::var("TESSERACT_CMD").unwrap_or_else(|_| "tesseract".to_string());

        let ocr_timeout = env::var("OCR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            ollama_url,
            ollama_model,
            tesseract_cmd,
            ocr_timeout,
        }
    }
}
