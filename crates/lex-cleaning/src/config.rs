//! Configuration types for the cleaning engine.
//!
//! Every tunable the loader, validator, compiler and executor read lives
//! here and is passed explicitly, so compilation stays a pure function of
//! (instruction, schema, config).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values treated as missing, compared case-insensitively after trimming.
pub const DEFAULT_MISSING_SENTINELS: [&str; 8] =
    ["", "na", "n/a", "null", "none", "nan", "missing", "#n/a"];

const DEFAULT_TYPE_SAMPLE_SIZE: usize = 100;
const DEFAULT_RAGGED_ROW_TOLERANCE: f64 = 0.0;
const DEFAULT_MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_HIGH_MISSING_RATIO: f64 = 0.5;
const DEFAULT_AI_CONFIDENCE_THRESHOLD: f64 = 0.5;
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Configuration for a cleaning run.
///
/// Use [`CleaningConfig::builder()`] for a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::config::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .use_ai(false)
///     .column_alias("years", "Age")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Cell values treated as missing (case-insensitive, compared after trimming).
    pub missing_sentinels: Vec<String>,

    /// Number of non-missing values sampled per column for type inference.
    /// Default: 100
    pub type_sample_size: usize,

    /// Fraction of records allowed to have a field count different from the header.
    /// Default: 0.0 (every record must match)
    pub ragged_row_tolerance: f64,

    /// Maximum accepted input size in bytes.
    /// Default: 100 MiB
    pub max_input_bytes: usize,

    /// Missing ratio above which the validator reports a column (0.0 - 1.0).
    /// Default: 0.5
    pub high_missing_ratio: f64,

    /// Whether to try the AI strategy before pattern matching.
    /// Default: true
    pub use_ai: bool,

    /// Minimum confidence for an AI candidate operation to be accepted.
    /// Default: 0.5
    pub ai_confidence_threshold: f64,

    /// Upper bound on a single call to the language-understanding service.
    /// Default: 30 seconds
    pub ai_timeout_secs: u64,

    /// Alias -> canonical column name, consulted by the pattern matcher.
    pub column_aliases: BTreeMap<String, String>,

    /// chrono format used when an instruction asks for dates without naming a format.
    /// Default: "%Y-%m-%d"
    pub default_date_format: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_sentinels: DEFAULT_MISSING_SENTINELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            type_sample_size: DEFAULT_TYPE_SAMPLE_SIZE,
            ragged_row_tolerance: DEFAULT_RAGGED_ROW_TOLERANCE,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            high_missing_ratio: DEFAULT_HIGH_MISSING_RATIO,
            use_ai: true,
            ai_confidence_threshold: DEFAULT_AI_CONFIDENCE_THRESHOLD,
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            column_aliases: BTreeMap::new(),
            default_date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Check whether a raw cell value counts as missing.
    pub fn is_missing_value(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.is_empty()
            || self
                .missing_sentinels
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(trimmed))
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("ragged_row_tolerance", self.ragged_row_tolerance),
            ("high_missing_ratio", self.high_missing_ratio),
            ("ai_confidence_threshold", self.ai_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidRatio {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.type_sample_size == 0 {
            return Err(ConfigValidationError::InvalidSampleSize(
                self.type_sample_size,
            ));
        }

        if self.ai_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if self.max_input_bytes == 0 {
            return Err(ConfigValidationError::InvalidInputLimit);
        }

        if !crate::utils::is_valid_date_format(&self.default_date_format) {
            return Err(ConfigValidationError::InvalidDateFormat(
                self.default_date_format.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid ratio for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidRatio { field: String, value: f64 },

    #[error("Invalid type sample size: {0} (must be at least 1)")]
    InvalidSampleSize(usize),

    #[error("Invalid AI timeout: must be at least 1 second")]
    InvalidTimeout,

    #[error("Invalid input limit: must be at least 1 byte")]
    InvalidInputLimit,

    #[error("Invalid date format: '{0}'")]
    InvalidDateFormat(String),
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    missing_sentinels: Option<Vec<String>>,
    type_sample_size: Option<usize>,
    ragged_row_tolerance: Option<f64>,
    max_input_bytes: Option<usize>,
    high_missing_ratio: Option<f64>,
    use_ai: Option<bool>,
    ai_confidence_threshold: Option<f64>,
    ai_timeout_secs: Option<u64>,
    column_aliases: BTreeMap<String, String>,
    default_date_format: Option<String>,
}

impl CleaningConfigBuilder {
    /// Replace the list of missing-value sentinels.
    pub fn missing_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_sentinels = Some(sentinels.into_iter().map(Into::into).collect());
        self
    }

    /// Set how many non-missing values are sampled for type inference.
    pub fn type_sample_size(mut self, size: usize) -> Self {
        self.type_sample_size = Some(size);
        self
    }

    /// Set the fraction of records allowed to have a mismatched field count.
    pub fn ragged_row_tolerance(mut self, tolerance: f64) -> Self {
        self.ragged_row_tolerance = Some(tolerance);
        self
    }

    /// Set the maximum accepted input size in bytes.
    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = Some(bytes);
        self
    }

    /// Set the missing ratio above which the validator reports a column.
    pub fn high_missing_ratio(mut self, ratio: f64) -> Self {
        self.high_missing_ratio = Some(ratio);
        self
    }

    /// Enable or disable the AI strategy.
    ///
    /// If disabled, instructions are compiled by pattern matching only.
    pub fn use_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = Some(use_ai);
        self
    }

    /// Set the minimum confidence for accepting an AI candidate.
    pub fn ai_confidence_threshold(mut self, threshold: f64) -> Self {
        self.ai_confidence_threshold = Some(threshold);
        self
    }

    /// Set the timeout for a single call to the language-understanding service.
    pub fn ai_timeout_secs(mut self, secs: u64) -> Self {
        self.ai_timeout_secs = Some(secs);
        self
    }

    /// Register an alias the pattern matcher resolves to a canonical column.
    pub fn column_alias(mut self, alias: impl Into<String>, column: impl Into<String>) -> Self {
        self.column_aliases.insert(alias.into(), column.into());
        self
    }

    /// Set the date format used when an instruction names none.
    pub fn default_date_format(mut self, format: impl Into<String>) -> Self {
        self.default_date_format = Some(format.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            missing_sentinels: self.missing_sentinels.unwrap_or(defaults.missing_sentinels),
            type_sample_size: self.type_sample_size.unwrap_or(defaults.type_sample_size),
            ragged_row_tolerance: self
                .ragged_row_tolerance
                .unwrap_or(defaults.ragged_row_tolerance),
            max_input_bytes: self.max_input_bytes.unwrap_or(defaults.max_input_bytes),
            high_missing_ratio: self
                .high_missing_ratio
                .unwrap_or(defaults.high_missing_ratio),
            use_ai: self.use_ai.unwrap_or(defaults.use_ai),
            ai_confidence_threshold: self
                .ai_confidence_threshold
                .unwrap_or(defaults.ai_confidence_threshold),
            ai_timeout_secs: self.ai_timeout_secs.unwrap_or(defaults.ai_timeout_secs),
            column_aliases: self.column_aliases,
            default_date_format: self
                .default_date_format
                .unwrap_or(defaults.default_date_format),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.type_sample_size, 100);
        assert_eq!(config.ragged_row_tolerance, 0.0);
        assert_eq!(config.ai_timeout_secs, 30);
        assert_eq!(config.default_date_format, "%Y-%m-%d");
        assert!(config.use_ai);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .use_ai(false)
            .ai_confidence_threshold(0.8)
            .ragged_row_tolerance(0.1)
            .column_alias("years", "Age")
            .build()
            .unwrap();

        assert!(!config.use_ai);
        assert_eq!(config.ai_confidence_threshold, 0.8);
        assert_eq!(config.ragged_row_tolerance, 0.1);
        assert_eq!(config.column_aliases.get("years"), Some(&"Age".to_string()));
    }

    #[test]
    fn test_missing_value_detection() {
        let config = CleaningConfig::default();
        assert!(config.is_missing_value(""));
        assert!(config.is_missing_value("   "));
        assert!(config.is_missing_value("NA"));
        assert!(config.is_missing_value(" n/a "));
        assert!(config.is_missing_value("NULL"));
        assert!(!config.is_missing_value("0"));
        assert!(!config.is_missing_value("Nancy"));
    }

    #[test]
    fn test_custom_sentinels() {
        let config = CleaningConfig::builder()
            .missing_sentinels(["?", "-"])
            .build()
            .unwrap();
        assert!(config.is_missing_value("?"));
        assert!(config.is_missing_value(""));
        assert!(!config.is_missing_value("NA"));
    }

    #[test]
    fn test_validation_invalid_ratio() {
        let result = CleaningConfig::builder().high_missing_ratio(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidRatio { .. }
        ));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let result = CleaningConfig::builder().ai_timeout_secs(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTimeout
        ));
    }

    #[test]
    fn test_validation_bad_date_format() {
        let result = CleaningConfig::builder().default_date_format("%Q").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDateFormat(_)
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "missing_sentinels": ["", "na"],
            "type_sample_size": 50,
            "ragged_row_tolerance": 0.05,
            "max_input_bytes": 1024,
            "high_missing_ratio": 0.9,
            "use_ai": false,
            "ai_confidence_threshold": 0.7,
            "ai_timeout_secs": 10,
            "column_aliases": {"years": "Age"},
            "default_date_format": "%d/%m/%Y"
        }"#;

        let config: CleaningConfig =
            serde_json::from_str(json).expect("Should deserialize from JSON");

        assert_eq!(config.type_sample_size, 50);
        assert_eq!(config.max_input_bytes, 1024);
        assert!(!config.use_ai);
        assert_eq!(config.default_date_format, "%d/%m/%Y");
        assert!(config.validate().is_ok());
    }
}
