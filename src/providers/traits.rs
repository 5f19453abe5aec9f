use crate::memory::{Message, Role};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// Role/content pair sent to a completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

impl CompletionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for CompletionMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Anything that can turn a conversation into the next assistant reply.
pub trait CompletionProvider: Send + Sync {
    /// Provider identifier (e.g. "groq", "openai").
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        messages: &'a [CompletionMessage],
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}
