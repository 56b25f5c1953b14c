//! AI-assisted quiz authoring.
//!
//! Pipeline: [`extract`] turns an upload into text, [`intent`] decides between
//! generation and chat, [`chat`] answers conversational messages and
//! [`generator`] runs the batched retry loop that produces validated
//! questions. All model traffic goes through [`llm::TextGenerator`].

pub mod chat;
pub mod extract;
pub mod generator;
pub mod intent;
pub mod llm;
pub mod parse;

pub use extract::{Document, OcrSettings, extract_text};
pub use generator::{GenerationSettings, QuizGenerator, resolve_question_count};
pub use intent::{Intent, IntentOutcome, classify_intent, process_user_intent};
pub use parse::GeneratedQuestion;
