//! Instruction-to-rule compilation.
//!
//! Two interchangeable strategies implement [`RuleStrategy`]:
//!
//! - [`AiStrategy`] asks an [`AIProvider`] for candidate operations and
//!   accepts or drops each one individually
//! - [`PatternStrategy`] runs deterministic keyword matchers over the
//!   instruction's segments
//!
//! [`RuleCompiler`] owns the selection policy: the AI strategy goes first
//! when configured, and pattern matching takes over when the AI call fails,
//! times out, or yields zero accepted rules. Compilation only ever sees the
//! schema, never cell values.

mod ai_strategy;
mod pattern;

pub use ai_strategy::AiStrategy;
pub use pattern::PatternStrategy;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::AIProvider;
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::rules::{FillStrategy, Rule, RuleSet};
use crate::types::{ColumnMeta, ColumnType, StrategyKind};
use crate::utils::standardize_names;

/// Instructions offered back to the user when nothing could be compiled.
pub const EXAMPLE_INSTRUCTIONS: [&str; 6] = [
    "Remove duplicate rows",
    "Fill missing age with the median",
    "Drop rows with missing email",
    "Convert name to title case and trim whitespace",
    "Rename dob to date_of_birth",
    "Remove rows where age < 18",
];

/// Rules and notes produced by one strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    pub rules: Vec<Rule>,
    pub warnings: Vec<String>,
}

/// A way of turning an instruction into rules.
pub trait RuleStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Compile against a schema. An empty rule list is not an error.
    fn compile(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<StrategyOutput>;
}

/// The compiler's output: an immutable rule set and how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledRules {
    pub rules: RuleSet,
    pub strategy: StrategyKind,
    pub warnings: Vec<String>,
}

/// Compiles instructions, preferring the AI strategy when one is available.
pub struct RuleCompiler {
    ai: Option<AiStrategy>,
    pattern: PatternStrategy,
}

impl RuleCompiler {
    /// Build a compiler. The AI strategy is only used when `config.use_ai`
    /// is set and a provider is given.
    pub fn new(config: &CleaningConfig, provider: Option<Arc<dyn AIProvider>>) -> Self {
        let ai = provider
            .filter(|_| config.use_ai)
            .map(|p| AiStrategy::new(p, config));
        Self {
            ai,
            pattern: PatternStrategy::new(config),
        }
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Compile an instruction into a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::UnparseableInstruction`] with example
    /// instructions when no strategy derives a single rule.
    pub fn compile(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<CompiledRules> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(unparseable("The instruction is empty"));
        }

        let mut warnings = Vec::new();

        if let Some(ai) = &self.ai {
            match ai.compile(instruction, schema) {
                Ok(output) if !output.rules.is_empty() => {
                    info!("AI strategy compiled {} rules", output.rules.len());
                    warnings.extend(output.warnings);
                    return Ok(CompiledRules {
                        rules: RuleSet::new(output.rules),
                        strategy: StrategyKind::Ai,
                        warnings,
                    });
                }
                Ok(output) => {
                    warn!("AI strategy accepted no operations, falling back to pattern matching");
                    warnings.extend(output.warnings);
                    warnings.push(
                        "AI interpretation produced no usable operations; used pattern matching"
                            .to_string(),
                    );
                }
                Err(e) => {
                    warn!("AI strategy unavailable, falling back to pattern matching: {}", e);
                    warnings.push(format!(
                        "AI interpretation unavailable ({}); used pattern matching",
                        e
                    ));
                }
            }
        }

        let output = self.pattern.compile(instruction, schema)?;
        warnings.extend(output.warnings);

        if output.rules.is_empty() {
            return Err(unparseable(
                "Could not derive any cleaning rule from the instruction",
            ));
        }

        info!("Pattern strategy compiled {} rules", output.rules.len());
        Ok(CompiledRules {
            rules: RuleSet::new(output.rules),
            strategy: StrategyKind::Pattern,
            warnings,
        })
    }
}

fn unparseable(message: &str) -> CleaningError {
    CleaningError::UnparseableInstruction {
        message: message.to_string(),
        suggestions: EXAMPLE_INSTRUCTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

// ============================================================================
// Schema tracking
// ============================================================================

/// The schema as it will look after the rules accepted so far, so a later
/// segment can name a column an earlier rule renamed.
#[derive(Debug, Clone)]
pub(crate) struct SchemaView {
    columns: Vec<ColumnMeta>,
}

impl SchemaView {
    pub(crate) fn new(schema: &[ColumnMeta]) -> Self {
        Self {
            columns: schema.to_vec(),
        }
    }

    pub(crate) fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Exact match first, then case-insensitive.
    pub(crate) fn resolve(&self, name: &str) -> Option<&ColumnMeta> {
        let name = name.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub(crate) fn apply(&mut self, rule: &Rule) {
        match rule {
            Rule::RenameColumn { from, to } => {
                if let Some(meta) = self.columns.iter_mut().find(|c| &c.name == from) {
                    meta.name = to.clone();
                }
            }
            Rule::DropColumns { columns } => {
                self.columns.retain(|c| !columns.contains(&c.name));
            }
            Rule::TypeCast { column, target } => {
                if let Some(meta) = self.columns.iter_mut().find(|c| &c.name == column) {
                    meta.column_type = target.column_type();
                }
            }
            Rule::StandardizeColumnNames => {
                let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
                for (meta, name) in self.columns.iter_mut().zip(standardize_names(&names)) {
                    meta.name = name;
                }
            }
            _ => {}
        }
    }
}

/// One `fill_missing` rule per applicable column, in schema order.
pub(crate) fn expand_fill(view: &SchemaView, strategy: &FillStrategy) -> Vec<Rule> {
    view.columns()
        .iter()
        .filter(|c| !strategy.requires_numeric() || c.column_type == ColumnType::Numeric)
        .map(|c| Rule::FillMissing {
            column: c.name.clone(),
            strategy: strategy.clone(),
        })
        .collect()
}
