//! One user turn: record the message, ask the provider, record the reply.

use crate::memory::{Message, SharedMemoryStore};
use crate::providers::{CompletionMessage, CompletionProvider};
use anyhow::Result;
use std::sync::Arc;

pub struct ChatSession {
    store: SharedMemoryStore,
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

impl ChatSession {
    pub fn new(
        store: SharedMemoryStore,
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &SharedMemoryStore {
        &self.store
    }

    /// Send `text` and return the resolved assistant message.
    ///
    /// The assistant placeholder is always resolved before this returns. On
    /// provider failure it holds the error text and the error is returned.
    pub async fn send(&self, text: &str, image_url: Option<&str>) -> Result<Message> {
        let mut store = self.store.lock().await;

        let mut user = Message::user(text);
        if let Some(url) = image_url {
            user = user.with_image(url);
        }
        store.save_message(user).await;

        // Window before the placeholder exists so it cannot take a slot.
        let request: Vec<CompletionMessage> = store
            .default_context_window()
            .iter()
            .filter(|m| !m.pending)
            .map(CompletionMessage::from)
            .collect();

        let placeholder = Message::pending_assistant();
        let placeholder_id = placeholder.id.clone();
        store.save_message(placeholder).await;

        tracing::debug!(
            session_id = store.session_id(),
            provider = self.provider.name(),
            model = %self.model,
            context = request.len(),
            "requesting completion"
        );

        let outcome = self.provider.complete(&request, &self.model).await;
        let (content, model) = match &outcome {
            Ok(reply) => (reply.clone(), Some(self.model.as_str())),
            Err(e) => (format!("Error: {e}"), None),
        };
        store.resolve_pending(&placeholder_id, content, model).await;

        let resolved = store
            .messages()
            .iter()
            .find(|m| m.id == placeholder_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("assistant reply {placeholder_id} vanished"))?;

        match outcome {
            Ok(_) => Ok(resolved),
            Err(e) => {
                tracing::warn!(
                    session_id = store.session_id(),
                    error = %e,
                    "completion failed"
                );
                Err(e)
            }
        }
    }
}
