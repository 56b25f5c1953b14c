use serde::Serialize;

use super::chat::chat_reply;
use super::llm::TextGenerator;

/// Words that mark a message as a request to build a quiz.
const GENERATION_KEYWORDS: [&str; 9] = [
    "generate",
    "create",
    "make",
    "quiz",
    "questions",
    "test",
    "exam",
    "paper",
    "assessment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Generate,
    Chat,
}

/// Intent with the chat reply already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IntentOutcome {
    Generate,
    Chat { response: String },
}

/// An attached file always means generation; otherwise a keyword decides.
pub fn classify_intent(user_input: &str, has_file: bool) -> Intent {
    if has_file {
        return Intent::Generate;
    }

    let text = user_input.trim().to_lowercase();
    if GENERATION_KEYWORDS.iter().any(|k| text.contains(k)) {
        Intent::Generate
    } else {
        Intent::Chat
    }
}

pub async fn process_user_intent(
    llm: &dyn TextGenerator,
    user_input: &str,
    has_file: bool,
) -> IntentOutcome {
    match classify_intent(user_input, has_file) {
        Intent::Generate => IntentOutcome::Generate,
        Intent::Chat => IntentOutcome::Chat {
            response: chat_reply(llm, &user_input.trim().to_lowercase()).await,
        },
    }
}
