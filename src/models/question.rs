// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Most options a question may carry.
pub const MAX_OPTIONS: usize = 4;

const MAX_TEXT_LEN: usize = 255;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,

    /// Points awarded for a correct answer.
    pub marks: i64,

    /// Time allowed, in seconds.
    pub duration: i64,

    pub explanation: Option<String>,
}

/// Represents the 'choices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Choice as shown to participants: correctness is hidden.
#[derive(Debug, Clone, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

impl From<&Choice> for PublicChoice {
    fn from(choice: &Choice) -> Self {
        Self {
            id: choice.id,
            text: choice.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithChoices {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// Question as served to a participant during play.
#[derive(Debug, Serialize)]
pub struct PlayQuestion {
    pub id: i64,
    pub text: String,
    pub marks: i64,
    pub duration: i64,
    pub choices: Vec<PublicChoice>,
}

impl From<&QuestionWithChoices> for PlayQuestion {
    fn from(q: &QuestionWithChoices) -> Self {
        Self {
            id: q.question.id,
            text: q.question.text.clone(),
            marks: q.question.marks,
            duration: q.question.duration,
            choices: q.choices.iter().map(PublicChoice::from).collect(),
        }
    }
}

fn default_marks() -> i64 {
    10
}

fn default_duration() -> i64 {
    5
}

/// DTO for one authored question.
///
/// `options` are positional; blank entries are skipped on save but keep their
/// position, so `correct_option` (1-based) always refers to the submitted slot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 255, message = "Question text must be between 1 and 255 characters."))]
    pub text: String,

    #[serde(default = "default_marks")]
    #[validate(range(min = 0, max = 1000))]
    pub marks: i64,

    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 3600))]
    pub duration: i64,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,

    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    #[serde(default)]
    pub correct_option: Option<usize>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    if options.iter().filter(|o| !o.trim().is_empty()).count() < 2 {
        return Err(validator::ValidationError::new("needs_two_options"));
    }
    if options.iter().any(|o| o.chars().count() > MAX_TEXT_LEN) {
        return Err(validator::ValidationError::new("option_too_long"));
    }
    Ok(())
}
