//! Google Gemini provider (<https://ai.google.dev/>).

use super::prompt::{build_interpret_prompt, parse_candidates};
use super::service::{ServiceConfig, check_status};
use super::{AIProvider, CandidateOperation};
use crate::types::ColumnMeta;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Turn<'a>; 1],
    generation_config: Generation,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: [OutgoingPart<'a>; 1],
}

#[derive(Serialize)]
struct OutgoingPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Generation {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Option<Vec<IncomingPart>>,
}

#[derive(Deserialize)]
struct IncomingPart {
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate. Blocked candidates count as no answer.
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && matches!(reason, "SAFETY" | "BLOCKED" | "PROHIBITED_CONTENT")
        {
            return Err(anyhow!("Gemini blocked the response ({})", reason));
        }

        candidate
            .content
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| anyhow!("Gemini returned an empty candidate"))
    }
}

/// Interprets instructions with Google Gemini, asking for a JSON response.
///
/// ```rust,ignore
/// use lex_cleaning::ai::{GeminiProvider, ServiceConfig};
///
/// let provider = GeminiProvider::new("your-api-key")?;
/// let pinned = GeminiProvider::with_config(
///     "your-api-key",
///     ServiceConfig::gemini().model("gemini-2.0-flash"),
/// )?;
/// ```
pub struct GeminiProvider {
    api_key: String,
    config: ServiceConfig,
    client: Client,
}

impl GeminiProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ServiceConfig::gemini())
    }

    pub fn with_config(api_key: impl Into<String>, config: ServiceConfig) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            client: config.client()?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        )
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: [Turn {
                role: "user",
                parts: [OutgoingPart { text: prompt }],
            }],
            generation_config: Generation {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
                response_mime_type: "application/json",
            },
        };

        let response = self.client.post(self.endpoint()).json(&request).send()?;
        let response: GenerateResponse = check_status("Gemini", response)?.json()?;
        response.into_text()
    }
}

impl AIProvider for GeminiProvider {
    fn interpret(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<Vec<CandidateOperation>> {
        let text = self.generate(&build_interpret_prompt(instruction, schema))?;
        debug!("Gemini returned {} bytes", text.len());
        parse_candidates(&text)
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        serde_json::from_str::<GenerateResponse>(json)?.into_text()
    }

    #[test]
    fn test_response_text() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "[{\"operation\": \"drop_duplicates\"}]"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let ops = parse_candidates(&parse(json).unwrap()).unwrap();
        assert_eq!(ops[0].operation, "drop_duplicates");
    }

    #[test]
    fn test_unusable_responses() {
        assert!(parse(r#"{"candidates": []}"#).is_err());
        assert!(parse(r#"{"candidates": null}"#).is_err());
        assert!(parse(r#"{}"#).is_err());
        assert!(parse(r#"{"candidates": [{"content": {"parts": null}}]}"#).is_err());
        assert!(parse(r#"{"candidates": "not an array"}"#).is_err());
    }

    #[test]
    fn test_blocked_response() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "[]"}]}, "finishReason": "SAFETY"}]}"#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: [Turn {
                role: "user",
                parts: [OutgoingPart { text: "hi" }],
            }],
            generation_config: Generation {
                temperature: 0.1,
                max_output_tokens: 10,
                response_mime_type: "application/json",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_endpoint_and_identity() {
        let config = ServiceConfig::gemini()
            .model("gemini-2.0-flash")
            .base_url("https://proxy.local/");
        let provider = GeminiProvider::with_config("k", config).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://proxy.local/gemini-2.0-flash:generateContent?key=k"
        );
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), Some("gemini-2.0-flash"));
    }
}
