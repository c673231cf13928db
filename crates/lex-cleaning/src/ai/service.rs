//! Connection settings shared by the HTTP providers.

use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use std::time::Duration;

/// Instructions compile to short JSON arrays; a low temperature keeps the
/// interpretation stable between calls.
const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach a hosted model.
///
/// Start from the preset of a provider and override what differs:
///
/// ```rust,ignore
/// use lex_cleaning::ai::{GeminiProvider, ServiceConfig};
///
/// let config = ServiceConfig::gemini()
///     .model("gemini-2.0-flash")
///     .temperature(0.0)
///     .timeout_secs(5);
/// let provider = GeminiProvider::with_config("your-api-key", config)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub model: String,
    /// 0.0 - 2.0
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Endpoint, or endpoint prefix for services that put the model in the path.
    pub base_url: String,
}

impl ServiceConfig {
    fn preset(base_url: &str, model: &str) -> Self {
        Self {
            model: model.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: base_url.to_owned(),
        }
    }

    /// Google Gemini, `generateContent` endpoint.
    pub fn gemini() -> Self {
        Self::preset(
            "https://generativelanguage.googleapis.com/v1beta/models/",
            "gemini-flash-lite-latest",
        )
    }

    /// OpenRouter chat completions.
    pub fn openrouter() -> Self {
        Self::preset(
            "https://openrouter.ai/api/v1/chat/completions",
            "deepseek/deepseek-chat",
        )
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(super) fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
    }
}

/// Turn a non-2xx reply into an error carrying the service's own message.
pub(super) fn check_status(
    service: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(anyhow!("{} API error {}: {}", service, status, body.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let gemini = ServiceConfig::gemini();
        assert_eq!(gemini.model, "gemini-flash-lite-latest");
        assert!(gemini.base_url.ends_with("/models/"));

        let openrouter = ServiceConfig::openrouter();
        assert_eq!(openrouter.model, "deepseek/deepseek-chat");
        assert_eq!(openrouter.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(openrouter.temperature, gemini.temperature);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::openrouter()
            .model("openai/gpt-4o-mini")
            .temperature(0.5)
            .max_tokens(200)
            .timeout_secs(5)
            .base_url("https://proxy.local/v1");

        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.base_url, "https://proxy.local/v1");
        assert!(config.client().is_ok());
    }
}
