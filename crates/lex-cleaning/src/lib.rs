//! Natural-language data cleaning.
//!
//! Describe a cleaning intent in plain words and have it applied
//! deterministically to a tabular dataset, with an audit trail.
//!
//! # Overview
//!
//! - **Loading**: delimited bytes become a [`Table`] with inferred column types
//! - **Validation**: informational quality checks ([`ValidationReport`])
//! - **Compilation**: the instruction becomes an ordered [`RuleSet`], via an
//!   optional AI provider with a deterministic pattern-matching fallback
//! - **Execution**: rules run one at a time; a rule that cannot be applied is
//!   skipped and logged, never fatal
//! - **Statistics**: before/after row, column, duplicate and missing counts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaning::{CleaningConfig, Pipeline};
//!
//! let bytes = std::fs::read("customers.csv")?;
//!
//! let result = Pipeline::builder()
//!     .config(CleaningConfig::builder().use_ai(false).build()?)
//!     .build()?
//!     .run(&bytes, "remove duplicates, fill missing age with median")?;
//!
//! for entry in &result.action_log {
//!     println!("{}", entry);
//! }
//! println!("{} -> {} rows", result.stats.rows_before, result.stats.rows_after);
//! ```
//!
//! # Replaying Rules
//!
//! A [`RuleSet`] never refers to a table, so it can be compiled once,
//! stored as JSON, and applied to any table with compatible columns:
//!
//! ```rust,ignore
//! use lex_cleaning::{RuleExecutor, RuleSet};
//!
//! let rules: RuleSet = serde_json::from_str(&stored)?;
//! let (cleaned, log) = RuleExecutor::new().execute(&table, &rules);
//! ```
//!
//! # AI Providers
//!
//! Implementations of [`ai::AIProvider`]:
//!
//! - [`ai::GeminiProvider`] - Google Gemini API
//! - [`ai::OpenRouterProvider`] - OpenRouter API (many hosted models)
//!
//! Both need the default `ai` feature. Any failure or timeout of the provider
//! falls back to pattern matching.

pub mod ai;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod rules;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use compiler::{
    AiStrategy, CompiledRules, EXAMPLE_INSTRUCTIONS, PatternStrategy, RuleCompiler, RuleStrategy,
    StrategyOutput,
};
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError};
pub use error::{CleaningError, Result, ResultExt};
pub use executor::RuleExecutor;
pub use loader::DatasetLoader;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use quality::DatasetValidator;
pub use reporting::StatsComputer;
pub use rules::{CaseStyle, Comparison, FillStrategy, Rule, RuleKind, RuleSet, TargetType};
pub use table::{Table, Value};
pub use types::{
    ActionLogEntry, ActionStatus, CleaningResult, CleaningStats, ColumnMeta, ColumnSummary,
    ColumnType, DatasetSummary, IssueSeverity, StrategyKind, ValidationIssue, ValidationReport,
};
