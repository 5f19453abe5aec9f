use super::types::{Message, Role};
use crate::providers::{CompletionMessage, CompletionProvider};

/// Instruction sent ahead of the transcript when asking for a summary.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation in about 50 words. \
Keep the main topics, decisions and any facts the user shared about themselves. \
Reply with the summary only.";

/// Below this many messages there is nothing worth asking the provider about.
const MIN_MESSAGES_FOR_SUMMARY: usize = 3;
/// Only the most recent messages are summarized.
const SUMMARY_WINDOW: usize = 10;

/// Deterministic summary used when the provider is skipped or fails.
pub fn fallback_summary(messages: &[Message]) -> String {
    let user_count = messages.iter().filter(|m| m.role == Role::User).count();
    format!("Conversation with {user_count} user messages")
}

/// `ROLE: content` transcript of the last [`SUMMARY_WINDOW`] messages.
pub fn transcript(messages: &[Message]) -> String {
    let start = messages.len().saturating_sub(SUMMARY_WINDOW);
    messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_ref().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary_request(messages: &[Message]) -> Vec<CompletionMessage> {
    vec![
        CompletionMessage::new(Role::System, SUMMARY_INSTRUCTION),
        CompletionMessage::new(Role::User, transcript(messages)),
    ]
}

/// Summarize `messages`, never failing: provider errors and empty replies
/// degrade to [`fallback_summary`].
pub async fn summarize(
    provider: &dyn CompletionProvider,
    model: &str,
    messages: &[Message],
) -> String {
    if messages.len() < MIN_MESSAGES_FOR_SUMMARY {
        return fallback_summary(messages);
    }

    let request = summary_request(messages);
    match provider.complete(&request, model).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!(provider = provider.name(), "empty summary; using fallback");
            fallback_summary(messages)
        }
        Err(error) => {
            tracing::warn!(
                provider = provider.name(),
                error = %error,
                "summary request failed; using fallback"
            );
            fallback_summary(messages)
        }
    }
}
