//! AI provider trait for abstracting the language-understanding service.
//!
//! This module defines the [`AIProvider`] trait that lets the rule compiler
//! work with any LLM backend (Gemini, OpenRouter, a local model, a test
//! double) without changing the compilation logic.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement the [`AIProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! The shared helpers in [`super::prompt`] build the prompt and parse the
//! model's JSON answer, so most providers only need an HTTP call.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::ColumnMeta;

/// One operation proposed by the language-understanding service.
///
/// Candidates are untrusted: the compiler accepts or drops each one
/// individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOperation {
    /// Operation name, expected to be in the rule vocabulary.
    #[serde(alias = "action")]
    pub operation: String,

    /// Target column, when the operation has one.
    #[serde(default)]
    pub column: Option<String>,

    /// Operation-specific parameters.
    #[serde(default, alias = "params")]
    pub parameters: Map<String, Value>,

    /// Self-reported confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl CandidateOperation {
    pub fn new(operation: impl Into<String>, column: Option<&str>, confidence: f64) -> Self {
        Self {
            operation: operation.into(),
            column: column.map(str::to_string),
            parameters: Map::new(),
            confidence,
        }
    }

    /// Add a parameter (builder style).
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// A parameter rendered as a string. Numbers and booleans are accepted.
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.parameters.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A parameter holding a list of strings (a single string is a one-item list).
    pub fn param_list(&self, key: &str) -> Option<Vec<String>> {
        match self.parameters.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}

/// Trait for AI providers that interpret cleaning instructions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the compiler runs the call on a
/// worker thread to enforce its timeout.
///
/// # Error Handling
///
/// Implementations should return meaningful errors via `anyhow::Result`.
/// The compiler treats any error as "service unavailable" and falls back to
/// pattern matching.
pub trait AIProvider: Send + Sync {
    /// Interpret an instruction against a schema (names and types only).
    ///
    /// Returns candidate operations in the order they should be applied.
    fn interpret(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<Vec<CandidateOperation>>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_defaults() {
        let json = r#"{"operation": "drop_duplicates"}"#;
        let candidate: CandidateOperation = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.column, None);
        assert!(candidate.parameters.is_empty());
        assert_eq!(candidate.confidence, 1.0);
    }

    #[test]
    fn test_candidate_aliases() {
        let json = r#"{"action": "fill_missing", "column": "age", "params": {"method": "mean"}, "confidence": 0.8}"#;
        let candidate: CandidateOperation = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.operation, "fill_missing");
        assert_eq!(candidate.param_str("method").as_deref(), Some("mean"));
        assert_eq!(candidate.confidence, 0.8);
    }

    #[test]
    fn test_param_helpers() {
        let candidate = CandidateOperation::new("fill_missing", Some("age"), 0.9)
            .with_param("value", 0)
            .with_param("columns", serde_json::json!(["a", "b"]));
        assert_eq!(candidate.param_str("value").as_deref(), Some("0"));
        assert_eq!(
            candidate.param_list("columns"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(candidate.param_list("missing"), None);
    }
}
