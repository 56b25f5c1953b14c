use std::time::Duration;

use super::llm::{GenerateRequest, TextGenerator};

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

pub const OFFLINE_REPLY: &str = "I am currently offline. Please check my connection.";
pub const EMPTY_REPLY: &str = "I'm listening.";

fn chat_prompt(message: &str) -> String {
    format!(
        r#"
You are a friendly and helpful AI assistant for the QuizMania application.
Conversation History: User said "{message}"

Instructions:
- Answer the user's question or greeting naturally and concisely.
- If the user asks for general information (e.g., "What is Python?"), provide a brief answer.
- If words like "Generate", "Create" or "Quiz" are NOT present in the user's input, do NOT mention generating a quiz unless asked for help.
- Keep responses under 50 words if possible.
"#
    )
}

/// Sends a conversational message to the model. Never fails: transport errors
/// become a fixed offline notice.
pub async fn chat_reply(llm: &dyn TextGenerator, message: &str) -> String {
    let request = GenerateRequest::new(chat_prompt(message), CHAT_TIMEOUT);

    match llm.generate(request).await {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                reply.to_string()
            }
        }
        Err(e) => {
            tracing::error!("Chat generation error: {}", e);
            OFFLINE_REPLY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::llm::{LlmError, testing::ScriptedGenerator};

    #[tokio::test]
    async fn prompt_embeds_message_and_is_not_json_mode() {
        let llm = ScriptedGenerator::replying(&["Hi!"]);
        chat_reply(&llm, "what is rust?").await;

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.contains(r#"User said "what is rust?""#));
        assert!(!requests[0].json_format);
        assert_eq!(requests[0].timeout, CHAT_TIMEOUT);
    }

    #[tokio::test]
    async fn errors_become_offline_notice() {
        let llm = ScriptedGenerator::new(vec![Err(LlmError::Unreachable {
            message: "refused".into(),
        })]);
        assert_eq!(chat_reply(&llm, "hello").await, OFFLINE_REPLY);
    }

    #[tokio::test]
    async fn blank_reply_becomes_listening_notice() {
        let llm = ScriptedGenerator::replying(&["   \n"]);
        assert_eq!(chat_reply(&llm, "hello").await, EMPTY_REPLY);
    }
}
