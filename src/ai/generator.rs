use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::llm::{GenerateRequest, TextGenerator};
use super::parse::{GeneratedQuestion, clean_candidate, parse_model_output};
use crate::config::{DEFAULT_GENERATED_QUESTIONS, MAX_GENERATED_QUESTIONS};

static WHOLE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());

const RETRY_INSTRUCTION: &str = "Ensure these questions are DIFFERENT from previous ones.";

/// Tuning knobs for the generation loop.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Most questions requested from the model in one call.
    pub batch_size: usize,
    /// Characters of extracted text included in the prompt.
    pub context_chars: usize,
    pub request_timeout: Duration,
    pub temperature: f32,
    /// Attempt budget is `max(min_attempts, num_questions + attempt_slack)`.
    pub min_attempts: usize,
    pub attempt_slack: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            context_chars: 4000,
            request_timeout: Duration::from_secs(90),
            temperature: 0.7,
            min_attempts: 10,
            attempt_slack: 5,
        }
    }
}

impl GenerationSettings {
    pub fn max_attempts(&self, num_questions: usize) -> usize {
        self.min_attempts.max(num_questions + self.attempt_slack)
    }
}

/// Drives the model in small batches until enough valid questions exist.
#[derive(Clone)]
pub struct QuizGenerator {
    llm: Arc<dyn TextGenerator>,
    settings: GenerationSettings,
}

impl QuizGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self::with_settings(llm, GenerationSettings::default())
    }

    pub fn with_settings(llm: Arc<dyn TextGenerator>, settings: GenerationSettings) -> Self {
        Self { llm, settings }
    }

    /// Generates up to `num_questions` questions from `text` and/or `user_prompt`.
    ///
    /// The result may be shorter than requested when the attempt budget runs
    /// out, and is empty when both inputs are empty or the model is unreachable
    /// from the start.
    pub async fn generate(
        &self,
        text: Option<&str>,
        user_prompt: Option<&str>,
        num_questions: usize,
    ) -> Vec<GeneratedQuestion> {
        let text = text.filter(|t| !t.is_empty());
        let user_prompt = user_prompt.filter(|p| !p.is_empty());
        if text.is_none() && user_prompt.is_none() {
            return Vec::new();
        }

        let context = build_context(text, user_prompt, self.settings.context_chars);
        let max_attempts = self.settings.max_attempts(num_questions);

        let mut accepted: Vec<GeneratedQuestion> = Vec::new();
        let mut attempts = 0;

        while accepted.len() < num_questions && attempts < max_attempts {
            attempts += 1;
            let batch = self.settings.batch_size.min(num_questions - accepted.len());

            let request = GenerateRequest::new(
                build_prompt(batch, &context, attempts > 1),
                self.settings.request_timeout,
            )
            .json()
            .temperature(self.settings.temperature);

            let raw = match self.llm.generate(request).await {
                Ok(raw) => raw,
                Err(e) if e.is_unreachable() => {
                    tracing::error!("Model connection error (attempt {}): {}", attempts, e);
                    break;
                }
                Err(e) => {
                    tracing::error!("Generation attempt {} error: {}", attempts, e);
                    continue;
                }
            };

            let Some(items) = parse_model_output(&raw) else {
                let snippet: String = raw.chars().take(100).collect();
                tracing::warn!(
                    "Failed to parse JSON for attempt {}. Text snippet: {}...",
                    attempts,
                    snippet
                );
                continue;
            };

            let before = accepted.len();
            for item in &items {
                if let Some(question) = clean_candidate(item, &accepted) {
                    accepted.push(question);
                }
            }
            tracing::debug!(
                attempt = attempts,
                candidates = items.len(),
                kept = accepted.len() - before,
                "generation batch processed"
            );
        }

        if accepted.len() < num_questions {
            tracing::warn!(
                "Generated {} of {} requested questions after {} attempts",
                accepted.len(),
                num_questions,
                attempts
            );
        }

        accepted.truncate(num_questions);
        accepted
    }
}

/// Assembles the content block shown to the model.
pub fn build_context(text: Option<&str>, user_prompt: Option<&str>, context_chars: usize) -> String {
    let mut context = String::new();
    if let Some(text) = text {
        let excerpt: String = text.chars().take(context_chars).collect();
        context.push_str(&format!("TEXT TO ANALYZE:\n{excerpt}\n"));
    }
    if let Some(prompt) = user_prompt {
        context.push_str(&format!("USER INSTRUCTIONS/TOPIC:\n{prompt}\n"));
    }
    context
}

pub fn build_prompt(batch_size: usize, context: &str, is_retry: bool) -> String {
    let retry = if is_retry { RETRY_INSTRUCTION } else { "" };
    format!(
        r#"
You are a Quiz Generator AI.
Analyze the provided content and generate EXACTLY {batch_size} multiple-choice questions (MCQs).

CRITICAL INSTRUCTIONS:
1. **FACTUAL ACCURACY**: Ensure every Question and Answer is FACTUALLY CORRECT.
2. **FORMAT**: RESPOND ONLY WITH A VALID JSON ARRAY. No introductory text. No markdown formatting.

REQUIRED JSON STRUCTURE EXAMPLE:
[
    {{
        "question": "What is the output of print(2+2)?",
        "options": {{
            "1": "3",
            "2": "4",
            "3": "5",
            "4": "22"
        }},
        "answer": "2",
        "explanation": "The addition operator adds two numbers."
    }}
]

GENERATE {batch_size} QUESTIONS NOW. CONTENT:
{context}
{retry}
"#
    )
}

/// Resolves how many questions to generate from the form field and the prompt.
///
/// A form value outside `1..=200` (or unparsable) falls back to the default;
/// the first whole number in the prompt wins when it is in range.
pub fn resolve_question_count(form_value: Option<&str>, user_input: &str) -> usize {
    let in_range = |n: usize| (1..=MAX_GENERATED_QUESTIONS).contains(&n);

    let mut count = form_value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| in_range(*n))
        .unwrap_or(DEFAULT_GENERATED_QUESTIONS);

    if let Some(n) = WHOLE_NUMBER
        .find(user_input)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| in_range(*n))
    {
        count = n;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::llm::{LlmError, testing::ScriptedGenerator};
    use serde_json::json;

    fn batch(questions: &[&str]) -> String {
        let items: Vec<_> = questions
            .iter()
            .map(|q| {
                json!({
                    "question": q,
                    "options": {"1": "yes", "2": "no"},
                    "answer": "a",
                })
            })
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    fn generator(llm: &Arc<ScriptedGenerator>) -> QuizGenerator {
        QuizGenerator::new(llm.clone())
    }

    #[tokio::test]
    async fn empty_inputs_skip_the_model() {
        let llm = Arc::new(ScriptedGenerator::replying(&[]));
        let out = generator(&llm).generate(Some(""), None, 5).await;
        assert!(out.is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn collects_across_batches_and_truncates() {
        let llm = Arc::new(ScriptedGenerator::replying(&[
            &batch(&["Is water wet today?", "Is fire hot today?", "Is ice cold today?"]),
            &batch(&["Is the sky blue today?", "Is grass green today?", "Is snow white today?"]),
        ]));
        let out = generator(&llm).generate(None, Some("nature"), 4).await;

        assert_eq!(out.len(), 4);
        assert_eq!(out[3].question, "Is the sky blue today?");
        assert_eq!(out[0].answer, "1");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("EXACTLY 4 multiple-choice"));
        assert!(!requests[0].prompt.contains(RETRY_INSTRUCTION));
        assert!(requests[1].prompt.contains("EXACTLY 1 multiple-choice"));
        assert!(requests[1].prompt.contains(RETRY_INSTRUCTION));
        assert!(requests[0].json_format);
        assert_eq!(requests[0].temperature, Some(0.7));
    }

    #[tokio::test]
    async fn batch_size_is_capped_at_five() {
        let llm = Arc::new(ScriptedGenerator::replying(&[]));
        generator(&llm).generate(None, Some("history"), 12).await;
        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("EXACTLY 5 multiple-choice"));
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let llm = Arc::new(ScriptedGenerator::replying(&[]));
        let out = generator(&llm).generate(None, Some("history"), 3).await;
        assert!(out.is_empty());
        assert_eq!(llm.calls(), 10);

        let llm = Arc::new(ScriptedGenerator::replying(&[]));
        generator(&llm).generate(None, Some("history"), 8).await;
        assert_eq!(llm.calls(), 13);
    }

    #[tokio::test]
    async fn unreachable_model_stops_immediately() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            Ok(batch(&["Is water wet today?"])),
            Err(LlmError::Unreachable { message: "refused".into() }),
            Ok(batch(&["Never reached at all?"])),
        ]));
        let out = generator(&llm).generate(None, Some("water"), 3).await;
        assert_eq!(out.len(), 1);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn other_errors_and_bad_output_are_retried() {
        let llm = Arc::new(ScriptedGenerator::new(vec![
            Err(LlmError::Timeout { duration: Duration::from_secs(90) }),
            Ok("sorry, I can't produce JSON".to_string()),
            Ok(batch(&["Is water wet today?", "Is water wet today?", "Why?"])),
            Ok(batch(&["Is fire hot today?"])),
        ]));
        let out = generator(&llm).generate(None, Some("elements"), 2).await;
        let texts: Vec<_> = out.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, ["Is water wet today?", "Is fire hot today?"]);
        assert_eq!(llm.calls(), 4);
    }

    #[tokio::test]
    async fn context_is_limited_to_leading_characters() {
        let llm = Arc::new(ScriptedGenerator::replying(&[&batch(&["Is water wet today?"])]));
        let text = format!("{}{}", "a".repeat(4000), "TAIL");
        generator(&llm).generate(Some(&text), Some("focus"), 1).await;

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("TEXT TO ANALYZE:"));
        assert!(requests[0].prompt.contains("USER INSTRUCTIONS/TOPIC:\nfocus"));
        assert!(!requests[0].prompt.contains("TAIL"));
    }

    #[test]
    fn build_context_with_prompt_only() {
        assert_eq!(
            build_context(None, Some("Rust traits"), 4000),
            "USER INSTRUCTIONS/TOPIC:\nRust traits\n"
        );
    }

    #[test]
    fn question_count_resolution() {
        assert_eq!(resolve_question_count(None, "quiz please"), 5);
        assert_eq!(resolve_question_count(Some("12"), "quiz please"), 12);
        assert_eq!(resolve_question_count(Some(" 7 "), ""), 7);
        assert_eq!(resolve_question_count(Some("0"), ""), 5);
        assert_eq!(resolve_question_count(Some("201"), ""), 5);
        assert_eq!(resolve_question_count(Some("ten"), ""), 5);
        assert_eq!(resolve_question_count(Some("10"), "Generate 3 questions"), 3);
        assert_eq!(resolve_question_count(Some("10"), "Generate 500 questions"), 10);
        assert_eq!(resolve_question_count(Some("10"), "python3 basics"), 10);
    }
}
