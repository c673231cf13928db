//! AI-backed compilation strategy.
//!
//! The provider's candidates are untrusted. Each one is checked on its own
//! and either becomes one or more rules or is dropped with a warning; a bad
//! candidate never invalidates its neighbours.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RuleStrategy, SchemaView, StrategyOutput, expand_fill};
use crate::ai::{AIProvider, CandidateOperation};
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::rules::{CaseStyle, Comparison, FillStrategy, Rule, RuleKind, TargetType};
use crate::types::{ColumnMeta, StrategyKind};
use crate::utils::is_valid_date_format;

/// `age >= 18`, `status == "active"`.
static CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*[`"']?([^`"'<>=!]+?)[`"']?\s*(==|!=|<=|>=|=|<|>)\s*["']?(.*?)["']?\s*$"#)
        .expect("Invalid regex: condition")
});

pub struct AiStrategy {
    provider: Arc<dyn AIProvider>,
    confidence_threshold: f64,
    timeout: Duration,
    default_date_format: String,
}

impl AiStrategy {
    pub fn new(provider: Arc<dyn AIProvider>, config: &CleaningConfig) -> Self {
        Self {
            provider,
            confidence_threshold: config.ai_confidence_threshold,
            timeout: Duration::from_secs(config.ai_timeout_secs),
            default_date_format: config.default_date_format.clone(),
        }
    }

    /// Call the provider on a worker thread so a hung request cannot block
    /// compilation past the configured timeout.
    fn request(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<Vec<CandidateOperation>> {
        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        let instruction = instruction.to_string();
        let schema = schema.to_vec();

        thread::spawn(move || {
            let _ = tx.send(provider.interpret(&instruction, &schema));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(candidates)) => Ok(candidates),
            Ok(Err(e)) => Err(CleaningError::ExternalServiceUnavailable(format!(
                "{} failed: {}",
                self.provider.name(),
                e
            ))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(CleaningError::ExternalServiceUnavailable(format!(
                    "{} did not answer within {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(
                CleaningError::ExternalServiceUnavailable(format!(
                    "{} worker stopped without an answer",
                    self.provider.name()
                )),
            ),
        }
    }

    fn accept(
        &self,
        candidate: &CandidateOperation,
        view: &SchemaView,
    ) -> std::result::Result<Vec<Rule>, String> {
        if candidate.confidence.is_nan() || candidate.confidence < self.confidence_threshold {
            return Err(format!(
                "confidence {:.2} below threshold {:.2}",
                candidate.confidence, self.confidence_threshold
            ));
        }

        let kind = RuleKind::from_name(&candidate.operation)
            .ok_or_else(|| "unknown operation".to_string())?;

        let column = match candidate.column.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(
                view.resolve(name)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| format!("unknown column '{}'", name))?,
            ),
            _ => None,
        };
        let required = || column.clone().ok_or_else(|| "missing column".to_string());

        let rule = match kind {
            RuleKind::DropDuplicates => {
                let columns = match candidate
                    .param_list("columns")
                    .or_else(|| candidate.param_list("subset"))
                {
                    Some(list) if !list.is_empty() => Some(resolve_all(view, &list)?),
                    _ => column.clone().map(|c| vec![c]),
                };
                Rule::DropDuplicates { columns }
            }
            RuleKind::DropRowsWithMissing => Rule::DropRowsWithMissing {
                column: column.clone(),
            },
            RuleKind::FillMissing => {
                let strategy = fill_strategy(candidate)?;
                match column.clone() {
                    Some(column) => Rule::FillMissing { column, strategy },
                    None => {
                        let rules = expand_fill(view, &strategy);
                        if rules.is_empty() {
                            return Err("no column suits the fill method".to_string());
                        }
                        return Ok(rules);
                    }
                }
            }
            RuleKind::StandardizeCase => {
                let case = candidate
                    .param_str("case")
                    .or_else(|| candidate.param_str("style"))
                    .and_then(|c| CaseStyle::parse(&c))
                    .ok_or_else(|| "missing or unknown case".to_string())?;
                Rule::StandardizeCase {
                    column: required()?,
                    case,
                }
            }
            RuleKind::StandardizeDateFormat => {
                let format = candidate
                    .param_str("format")
                    .filter(|f| is_valid_date_format(f))
                    .unwrap_or_else(|| self.default_date_format.clone());
                Rule::StandardizeDateFormat {
                    column: required()?,
                    format,
                }
            }
            RuleKind::RenameColumn => {
                let to = candidate
                    .param_str("new_name")
                    .or_else(|| candidate.param_str("to"))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| "missing new name".to_string())?;
                Rule::RenameColumn {
                    from: required()?,
                    to,
                }
            }
            RuleKind::TrimWhitespace => Rule::TrimWhitespace {
                column: column.clone(),
            },
            RuleKind::TypeCast => {
                let target = ["target", "dtype", "type"]
                    .iter()
                    .find_map(|key| candidate.param_str(key))
                    .and_then(|t| TargetType::parse(&t))
                    .ok_or_else(|| "missing or unknown target type".to_string())?;
                Rule::TypeCast {
                    column: required()?,
                    target,
                }
            }
            RuleKind::DropColumns => {
                let mut columns = match candidate.param_list("columns") {
                    Some(list) => resolve_all(view, &list)?,
                    None => Vec::new(),
                };
                if let Some(col) = column.clone()
                    && !columns.contains(&col)
                {
                    columns.insert(0, col);
                }
                if columns.is_empty() {
                    return Err("no columns to drop".to_string());
                }
                Rule::DropColumns { columns }
            }
            RuleKind::StandardizeColumnNames => Rule::StandardizeColumnNames,
            RuleKind::FilterRows => self.filter_rule(candidate, column, view)?,
        };

        Ok(vec![rule])
    }

    fn filter_rule(
        &self,
        candidate: &CandidateOperation,
        column: Option<String>,
        view: &SchemaView,
    ) -> std::result::Result<Rule, String> {
        let op = candidate
            .param_str("operator")
            .or_else(|| candidate.param_str("op"))
            .and_then(|o| Comparison::parse(&o));
        let value = candidate.param_str("value");

        if let (Some(column), Some(op), Some(value)) = (column.clone(), op, value) {
            return Ok(Rule::FilterRows { column, op, value });
        }

        let condition = candidate
            .param_str("condition")
            .ok_or_else(|| "missing filter condition".to_string())?;
        let caps = CONDITION
            .captures(&condition)
            .ok_or_else(|| format!("cannot read condition '{}'", condition))?;
        let name = caps[1].trim();
        let column = view
            .resolve(name)
            .map(|c| c.name.clone())
            .ok_or_else(|| format!("unknown column '{}'", name))?;
        let op = Comparison::parse(&caps[2])
            .ok_or_else(|| format!("unknown operator '{}'", &caps[2]))?;
        Ok(Rule::FilterRows {
            column,
            op,
            value: caps[3].to_string(),
        })
    }
}

impl RuleStrategy for AiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ai
    }

    fn compile(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<StrategyOutput> {
        let candidates = self.request(instruction, schema)?;
        debug!(
            "{} proposed {} operations",
            self.provider.name(),
            candidates.len()
        );

        let mut view = SchemaView::new(schema);
        let mut output = StrategyOutput::default();

        for (index, candidate) in candidates.iter().enumerate() {
            match self.accept(candidate, &view) {
                Ok(rules) => {
                    for rule in rules {
                        view.apply(&rule);
                        output.rules.push(rule);
                    }
                }
                Err(reason) => {
                    warn!(
                        "Dropped AI operation {} '{}': {}",
                        index + 1,
                        candidate.operation,
                        reason
                    );
                    output.warnings.push(format!(
                        "Dropped AI operation {} '{}': {}",
                        index + 1,
                        candidate.operation,
                        reason
                    ));
                }
            }
        }

        Ok(output)
    }
}

fn resolve_all(view: &SchemaView, names: &[String]) -> std::result::Result<Vec<String>, String> {
    names
        .iter()
        .map(|name| {
            view.resolve(name)
                .map(|c| c.name.clone())
                .ok_or_else(|| format!("unknown column '{}'", name))
        })
        .collect()
}

fn fill_strategy(candidate: &CandidateOperation) -> std::result::Result<FillStrategy, String> {
    let value = candidate.param_str("value");
    let method = candidate
        .param_str("method")
        .or_else(|| candidate.param_str("strategy"))
        .map(|m| m.trim().to_ascii_lowercase().replace([' ', '-'], "_"));

    match (method.as_deref(), value) {
        (Some("mean" | "average" | "avg"), _) => Ok(FillStrategy::Mean),
        (Some("median"), _) => Ok(FillStrategy::Median),
        (Some("mode" | "most_frequent"), _) => Ok(FillStrategy::Mode),
        (Some("forward_fill" | "ffill" | "forward"), _) => Ok(FillStrategy::ForwardFill),
        (Some("backward_fill" | "bfill" | "backward"), _) => Ok(FillStrategy::BackwardFill),
        (Some("constant" | "value") | None, Some(value)) => Ok(FillStrategy::Constant { value }),
        (Some("constant" | "value"), None) => Err("constant fill without a value".to_string()),
        (Some(other), _) => Err(format!("unknown fill method '{}'", other)),
        (None, None) => Err("missing fill method".to_string()),
    }
}
