//! Error types for the cleaning engine.
//!
//! Only [`CleaningError::MalformedInput`] and
//! [`CleaningError::UnparseableInstruction`] ever reach the caller of a
//! cleaning run. Rule failures are recorded in the action log and service
//! failures trigger the pattern fallback, so both stay inside the engine.
//!
//! Errors are serializable as `{code, message}` so the presentation layer can
//! show them without knowing the Rust types.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning engine.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The input could not be decoded or is structurally broken.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// No compiler strategy could derive a single rule from the instruction.
    #[error("{message}")]
    UnparseableInstruction {
        message: String,
        suggestions: Vec<String>,
    },

    /// A single rule could not be applied to the current table.
    #[error("Cannot apply {rule}: {reason}")]
    RuleApplication { rule: String, reason: String },

    /// The language-understanding service failed or timed out.
    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (for AI providers, only with "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Build a rule application error.
    pub fn rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        CleaningError::RuleApplication {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::UnparseableInstruction { .. } => "UNPARSEABLE_INSTRUCTION",
            Self::RuleApplication { .. } => "RULE_APPLICATION_ERROR",
            Self::ExternalServiceUnavailable(_) => "EXTERNAL_SERVICE_UNAVAILABLE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Example instructions attached to an unparseable instruction.
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::UnparseableInstruction { suggestions, .. } => suggestions,
            Self::WithContext { source, .. } => source.suggestions(),
            _ => &[],
        }
    }

    /// Whether this error is meant to be shown to the end user.
    ///
    /// Everything else degrades gracefully inside a cleaning run.
    pub fn is_user_facing(&self) -> bool {
        match self {
            Self::MalformedInput(_) | Self::UnparseableInstruction { .. } => true,
            Self::WithContext { source, .. } => source.is_user_facing(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for CleaningError {
    fn from(error: crate::config::ConfigValidationError) -> Self {
        CleaningError::InvalidConfig(error.to_string())
    }
}

/// Serialize implementation for IPC/HTTP layers.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let suggestions = self.suggestions();
        let field_count = if suggestions.is_empty() { 2 } else { 3 };
        let mut state = serializer.serialize_struct("CleaningError", field_count)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        if !suggestions.is_empty() {
            state.serialize_field("suggestions", suggestions)?;
        }
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
