//! Generic OpenAI-compatible provider.
//! Groq and OpenAI both serve the same `/chat/completions` format, so a
//! single implementation covers them.

use super::http_client::build_provider_client;
use super::scrub::sanitize_api_error;
use super::traits::{CompletionMessage, CompletionProvider};
use crate::error::ProviderError;
use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) api_key: Option<String>,
    temperature: f64,
    /// Pre-computed chat completions URL (avoids `format!` per request).
    cached_chat_url: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let cached_chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            api_key: api_key.map(ToString::to_string),
            temperature: 0.7,
            cached_chat_url,
            client: build_provider_client(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn chat_completions_url(&self) -> &str {
        &self.cached_chat_url
    }

    async fn call_chat_completions(
        &self,
        messages: &[CompletionMessage],
        model: &str,
    ) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::MissingKey {
                provider: self.name.clone(),
            })?;

        let request = ChatRequest {
            model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{} chat completions request failed", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
            return Err(classify_failure(&self.name, status, &body).into());
        }

        let chat: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("{} chat completions JSON decode failed", self.name))?;

        extract_chat_text(&chat).ok_or_else(|| {
            ProviderError::EmptyCompletion {
                provider: self.name.clone(),
            }
            .into()
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [CompletionMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_chat_text(response: &ChatResponse) -> Option<String> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

fn classify_failure(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
            provider: provider.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            provider: provider.to_string(),
        },
        _ => ProviderError::Request {
            provider: provider.to_string(),
            message: format!("{status}: {}", sanitize_api_error(body)),
        },
    }
}

impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [CompletionMessage],
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.call_chat_completions(messages, model))
    }
}
