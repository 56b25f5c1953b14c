// src/models/review.rs

use serde::{Deserialize, Serialize};

use crate::ai::GeneratedQuestion;
use crate::models::question::MAX_OPTIONS;

const DEFAULT_DRAFT_TITLE: &str = "Generated Quiz";

/// DTO for turning generated questions into an editable draft.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub questions: Vec<GeneratedQuestion>,
}

/// A quiz draft shaped like `CreateQuizRequest`, so the client can edit it and
/// post it straight to quiz creation.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuizDraft {
    pub title: String,
    pub questions: Vec<DraftQuestion>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DraftQuestion {
    /// 1-based position in the draft.
    pub id: usize,
    pub text: String,
    pub marks: i64,
    pub duration: i64,
    pub explanation: Option<String>,
    /// Option slots 1..=4; a missing slot is an empty string.
    pub options: Vec<String>,
    pub correct_option: Option<usize>,
}

impl QuizDraft {
    pub fn from_generated(title: Option<String>, questions: &[GeneratedQuestion]) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_DRAFT_TITLE.to_string());

        let questions = questions
            .iter()
            .enumerate()
            .map(|(i, q)| DraftQuestion::from_generated(i + 1, q))
            .collect();

        Self { title, questions }
    }
}

impl DraftQuestion {
    fn from_generated(id: usize, generated: &GeneratedQuestion) -> Self {
        let numbered = (1..=MAX_OPTIONS).any(|k| generated.options.contains_key(&k.to_string()));

        let options: Vec<String> = if numbered {
            (1..=MAX_OPTIONS)
                .map(|k| {
                    generated
                        .options
                        .get(&k.to_string())
                        .map(|v| v.trim().to_string())
                        .unwrap_or_default()
                })
                .collect()
        } else {
            generated
                .options
                .values()
                .take(MAX_OPTIONS)
                .map(|v| v.trim().to_string())
                .collect()
        };

        let correct_option = generated
            .answer
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=options.len()).contains(n));

        Self {
            id,
            text: generated.question.clone(),
            marks: 10,
            duration: 5,
            explanation: generated.explanation.clone(),
            options,
            correct_option,
        }
    }
}
