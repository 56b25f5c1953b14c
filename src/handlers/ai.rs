// src/handlers/ai.rs

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    ai::{Document, IntentOutcome, OcrSettings, extract_text, process_user_intent, resolve_question_count},
    error::AppError,
    models::review::{QuizDraft, ReviewRequest},
    state::AppState,
    utils::jwt::Claims,
};

/// Fields of the generator form.
#[derive(Debug, Default)]
struct GeneratorForm {
    user_input: String,
    num_questions: Option<String>,
    document: Option<Document>,
}

async fn read_form(mut multipart: Multipart) -> Result<GeneratorForm, AppError> {
    let mut form = GeneratorForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_input" => form.user_input = field.text().await?.trim().to_string(),
            "num_questions" => form.num_questions = Some(field.text().await?),
            "document" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if !filename.is_empty() || !bytes.is_empty() {
                    form.document = Some(Document::new(filename, content_type, bytes.to_vec()));
                }
            }
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }

    Ok(form)
}

/// AI quiz generator / assistant.
///
/// Accepts a multipart form with `user_input`, `num_questions` and an optional
/// `document`. Conversational messages are answered by the model; generation
/// requests return validated questions ready for review.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let form = read_form(multipart).await?;

    if form.user_input.is_empty() && form.document.is_none() {
        return Err(AppError::BadRequest(
            "Provide a message or upload a document".to_string(),
        ));
    }

    tracing::info!(
        user_id,
        input = %form.user_input,
        file = ?form.document.as_ref().map(|d| d.filename.as_str()),
        "Processing AI request"
    );

    let outcome =
        process_user_intent(state.llm.as_ref(), &form.user_input, form.document.is_some()).await;
    if let IntentOutcome::Chat { .. } = outcome {
        return Ok(Json(serde_json::to_value(outcome)?));
    }

    let num_questions = resolve_question_count(form.num_questions.as_deref(), &form.user_input);

    let text = match &form.document {
        Some(document) => {
            let ocr = OcrSettings {
                command: state.config.tesseract_cmd.clone(),
                timeout: state.config.ocr_timeout,
            };
            let text = extract_text(document, &ocr).await;
            tracing::debug!("Extracted {} characters from {}", text.len(), document.filename);
            Some(text)
        }
        None => None,
    };

    let questions = state
        .quiz_generator()
        .generate(text.as_deref(), Some(&form.user_input), num_questions)
        .await;

    tracing::info!("Generated {} of {} questions", questions.len(), num_questions);

    Ok(Json(json!({
        "type": "generate",
        "num_questions": num_questions,
        "questions": questions,
    })))
}

/// Turns generated questions into an editable quiz draft.
pub async fn review(
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.user_id()?;
    Ok(Json(QuizDraft::from_generated(payload.title, &payload.questions)))
}
