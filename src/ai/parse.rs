//! Recovery and validation of model output.
//!
//! Small local models rarely return exactly the JSON they were asked for, so
//! every reply goes through a lenient parse followed by per-question cleaning.
//! Anything that still looks wrong is dropped rather than repaired further.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outermost `[ ... ]` span, across lines.
static ARRAY_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static LEADING_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[?.\-\s]+").unwrap());

/// "ng code" left behind when the model truncates "Following code".
static TRUNCATED_FOLLOWING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^A-Za-z])ng code").unwrap());

const MIN_QUESTION_CHARS: usize = 10;
const MIN_OPTIONS: usize = 2;

/// A validated multiple-choice question as produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    /// Option key ("1".."4" when the model follows instructions) to option text.
    pub options: BTreeMap<String, String>,
    /// Key of the correct option, or the model's raw answer if it matched none.
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Parses a model reply into candidate items.
///
/// Returns `None` when nothing usable was found, which callers treat as a
/// failed attempt.
pub fn parse_model_output(raw: &str) -> Option<Vec<Value>> {
    let data = serde_json::from_str::<Value>(raw).ok().or_else(|| {
        ARRAY_SPAN
            .find(raw)
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
    })?;

    if is_blank(&data) {
        return None;
    }

    let data = match data {
        Value::Object(mut map) => match map.remove("questions") {
            Some(questions) => questions,
            None => Value::Array(vec![Value::Object(map)]),
        },
        other => other,
    };

    match data {
        Value::Array(items) => Some(items),
        _ => Some(Vec::new()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strips leading punctuation noise and repairs the "ng code" truncation.
pub fn clean_question_text(raw: &str) -> String {
    let text = LEADING_JUNK.replace(raw.trim(), "");
    TRUNCATED_FOLLOWING
        .replace_all(&text, "${1}following code")
        .into_owned()
}

fn looks_like_sentence(text: &str) -> bool {
    if text.chars().count() < MIN_QUESTION_CHARS {
        return false;
    }
    match text.chars().next() {
        Some(c) => c.is_alphanumeric() || matches!(c, '"' | '\'' | '('),
        None => false,
    }
}

fn collect_options(value: &Value) -> Option<BTreeMap<String, String>> {
    let options: BTreeMap<String, String> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), stringify(v))).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), stringify(v)))
            .collect(),
        _ => return None,
    };

    (options.len() >= MIN_OPTIONS).then_some(options)
}

/// Maps letter answers to numeric keys, then falls back to matching option text.
pub fn normalize_answer(raw: &str, options: &BTreeMap<String, String>) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    let answer = match lowered.as_str() {
        "a" => "1",
        "b" => "2",
        "c" => "3",
        "d" => "4",
        _ => trimmed,
    };

    if matches!(answer, "1" | "2" | "3" | "4") {
        return answer.to_string();
    }

    options
        .iter()
        .find(|(_, text)| text.to_lowercase() == lowered)
        .map(|(key, _)| key.clone())
        .unwrap_or_else(|| answer.to_string())
}

/// Validates and cleans one candidate. `accepted` holds the questions kept so
/// far and is used to reject exact duplicates.
pub fn clean_candidate(item: &Value, accepted: &[GeneratedQuestion]) -> Option<GeneratedQuestion> {
    let obj = item.as_object()?;
    let (question, options, answer) = (
        obj.get("question")?,
        obj.get("options")?,
        obj.get("answer")?,
    );

    let question = clean_question_text(&stringify(question));
    if !looks_like_sentence(&question) {
        return None;
    }

    let options = collect_options(options)?;

    if accepted.iter().any(|q| q.question == question) {
        return None;
    }

    let answer = normalize_answer(&stringify(answer), &options);
    let explanation = obj
        .get("explanation")
        .filter(|v| !v.is_null())
        .map(stringify);

    Some(GeneratedQuestion {
        question,
        options,
        answer,
        explanation,
    })
}
