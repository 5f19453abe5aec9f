use super::compatible::OpenAiCompatibleProvider;
use super::traits::CompletionProvider;
use crate::error::ProviderError;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Resolve the API key: explicit config first, then the provider's own env var.
pub fn resolve_api_key(name: &str, configured: Option<&str>) -> Option<String> {
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }
    let env_var = match name {
        "groq" => "GROQ_API_KEY",
        "openai" => "OPENAI_API_KEY",
        _ => return None,
    };
    std::env::var(env_var).ok().filter(|k| !k.is_empty())
}

pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    temperature: f64,
) -> anyhow::Result<Box<dyn CompletionProvider>> {
    let base_url = match name {
        "groq" => GROQ_BASE_URL,
        "openai" => OPENAI_BASE_URL,
        other => return Err(ProviderError::Unknown(other.to_string()).into()),
    };
    let provider =
        OpenAiCompatibleProvider::new(name, base_url, api_key).with_temperature(temperature);
    Ok(Box::new(provider))
}
