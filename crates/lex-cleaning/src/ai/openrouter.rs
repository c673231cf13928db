//! OpenRouter provider (<https://openrouter.ai/>): many hosted models
//! behind one chat-completions endpoint.

use super::prompt::{build_interpret_prompt, parse_candidates};
use super::service::{ServiceConfig, check_status};
use super::{AIProvider, CandidateOperation};
use crate::types::ColumnMeta;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|reply| reply.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("OpenRouter returned no message content"))
    }
}

/// Interprets instructions with any model hosted on OpenRouter.
pub struct OpenRouterProvider {
    api_key: String,
    config: ServiceConfig,
    client: Client,
}

impl OpenRouterProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ServiceConfig::openrouter())
    }

    pub fn with_config(api_key: impl Into<String>, config: ServiceConfig) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            client: config.client()?,
            config,
        })
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "lex-cleaning")
            .json(&request)
            .send()?;
        let response: ChatResponse = check_status("OpenRouter", response)?.json()?;
        response.into_text()
    }
}

impl AIProvider for OpenRouterProvider {
    fn interpret(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<Vec<CandidateOperation>> {
        let text = self.complete(&build_interpret_prompt(instruction, schema))?;
        debug!("OpenRouter ({}) returned {} bytes", self.config.model, text.len());
        parse_candidates(&text)
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        serde_json::from_str::<ChatResponse>(json)?.into_text()
    }

    #[test]
    fn test_response_text() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "[{\"operation\": \"standardize_column_names\", \"confidence\": 0.9}]"
                }
            }]
        }"#;
        let ops = parse_candidates(&parse(json).unwrap()).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation, "standardize_column_names");
        assert_eq!(ops[0].confidence, 0.9);
    }

    #[test]
    fn test_unusable_responses() {
        assert!(parse(r#"{"choices": []}"#).is_err());
        assert!(parse(r#"{"choices": [{"message": null}]}"#).is_err());
        assert!(parse(r#"{"choices": [{"message": {"content": "  "}}]}"#).is_err());
        assert!(parse(r#"{"choices": [{"message": "not an object"}]}"#).is_err());
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.0,
            max_tokens: 5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 5);
    }

    #[test]
    fn test_identity() {
        let provider = OpenRouterProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "OpenRouter");
        assert_eq!(provider.model(), Some("deepseek/deepseek-chat"));

        let config = ServiceConfig::openrouter().model("custom-model");
        let provider = OpenRouterProvider::with_config("test-key", config).unwrap();
        assert_eq!(provider.model(), Some("custom-model"));
    }
}
