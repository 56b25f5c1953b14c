//! Plain-text extraction from uploaded documents.
//!
//! PDFs go through `pdf-extract`, images through the `tesseract` CLI. Failures
//! never reach the caller: they are logged and the document is treated as
//! having no readable text, so generation can still infer a topic from the
//! filename.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const NO_TEXT_NOTICE: &str =
    "(No readable text found in file. Please infer topic from filename.)";

const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    #[error("ocr failed: {0}")]
    Ocr(String),

    #[error("ocr timed out after {0:?}")]
    OcrTimeout(Duration),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Unsupported,
}

impl Document {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    /// Decides how to read the file from its declared content type and name.
    pub fn kind(&self) -> DocumentKind {
        let content_type = self.content_type.as_deref().unwrap_or("");
        let name = self.filename.to_lowercase();

        if content_type.contains("pdf") || name.ends_with(".pdf") {
            DocumentKind::Pdf
        } else if content_type.contains("image")
            || IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        {
            DocumentKind::Image
        } else {
            DocumentKind::Unsupported
        }
    }
}

/// How image OCR is performed.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub command: String,
    pub timeout: Duration,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Extracts text from `document`, prefixed with its filename.
pub async fn extract_text(document: &Document, ocr: &OcrSettings) -> String {
    let text = match document.kind() {
        DocumentKind::Pdf => extract_pdf(document.bytes.clone()).await,
        DocumentKind::Image => extract_image(&document.bytes, ocr).await,
        DocumentKind::Unsupported => {
            tracing::warn!(filename = %document.filename, "unsupported document type");
            Ok(String::new())
        }
    };

    let text = text.unwrap_or_else(|e| {
        tracing::error!(filename = %document.filename, "Error extracting text: {}", e);
        String::new()
    });

    with_filename(&document.filename, &text)
}

fn with_filename(filename: &str, text: &str) -> String {
    if text.is_empty() {
        format!("Filename: {filename}\n\n{NO_TEXT_NOTICE}")
    } else {
        format!("Filename: {filename}\n\n{text}")
    }
}

async fn extract_pdf(bytes: Vec<u8>) -> Result<String, ExtractError> {
    // pdf-extract is CPU bound and synchronous.
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractError::Pdf(e.to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(join_pages(&text))
}

/// Pages come back separated by form feeds; join them with newlines.
fn join_pages(raw: &str) -> String {
    raw.split('\x0C')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

async fn extract_image(bytes: &[u8], ocr: &OcrSettings) -> Result<String, ExtractError> {
    let run = async {
        let mut child = Command::new(&ocr.command)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(bytes)
                .await
                .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    };

    tokio::time::timeout(ocr.timeout, run)
        .await
        .map_err(|_| ExtractError::OcrTimeout(ocr.timeout))?
}
