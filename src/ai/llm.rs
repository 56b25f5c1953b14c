//! Client seam for the local text-generation model.
//!
//! Everything above this module talks to a [`TextGenerator`]; the production
//! implementation is [`OllamaClient`], which speaks Ollama's non-streaming
//! `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors surfaced by a text generator.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The server could not be reached at all. Callers stop retrying on this.
    #[error("model server unreachable: {message}")]
    Unreachable { message: String },

    #[error("request timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("model server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode model response: {message}")]
    Decode { message: String },

    #[error("invalid model endpoint: {message}")]
    Endpoint { message: String },
}

impl LlmError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, LlmError::Unreachable { .. })
    }
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Ask the server to constrain output to JSON.
    pub json_format: bool,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            prompt: prompt.into(),
            json_format: false,
            temperature: None,
            timeout,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw text produced by the model for `request`.
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama provider over plain HTTP.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: Url,
    model: String,
}

impl OllamaClient {
    pub fn new(mut base_url: Url, model: impl Into<String>) -> Self {
        // without a trailing slash `join` would replace the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            http: reqwest::Client::new(),
            base_url,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<Url, LlmError> {
        self.base_url
            .join("api/generate")
            .map_err(|e| LlmError::Endpoint {
                message: e.to_string(),
            })
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_connect() {
        LlmError::Unreachable {
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        LlmError::Timeout { duration: timeout }
    } else if err.is_decode() {
        LlmError::Decode {
            message: err.to_string(),
        }
    } else if let Some(status) = err.status() {
        LlmError::Status {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else {
        LlmError::Unreachable {
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let body = OllamaGenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            format: request.json_format.then_some("json"),
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        tracing::debug!(model = %self.model, json = request.json_format, "sending generate request");

        let response = self
            .http
            .post(self.endpoint()?)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, request.timeout))?
            .error_for_status()
            .map_err(|e| map_transport_error(e, request.timeout))?;

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error(e, request.timeout))?;

        Ok(parsed.response)
    }
}
