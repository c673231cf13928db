//! Rule execution.
//!
//! [`RuleExecutor`] applies a [`RuleSet`] to a working copy of a table, one
//! rule at a time and in order. Every rule leaves exactly one entry in the
//! action log. A rule that cannot be applied is skipped with its reason and
//! leaves the table untouched; execution always continues with the next rule.

mod columns;
mod fill;
mod rows;
mod transforms;

use tracing::{debug, info, warn};

use crate::error::{CleaningError, Result};
use crate::rules::{Rule, RuleSet};
use crate::table::Table;
use crate::types::ActionLogEntry;

/// Applies rules to tables. Holds no state between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExecutor;

impl RuleExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `rules` in order, returning the transformed table and one log
    /// entry per rule. The input table is never modified.
    pub fn execute(&self, table: &Table, rules: &RuleSet) -> (Table, Vec<ActionLogEntry>) {
        info!(
            "Executing {} rules on {} rows x {} columns",
            rules.len(),
            table.height(),
            table.width()
        );

        let mut working = table.clone();
        let mut log = Vec::with_capacity(rules.len());

        for (index, rule) in rules.iter().enumerate() {
            // Each rule runs on its own copy so a failure midway leaves no trace.
            let mut candidate = working.clone();
            match Self::apply(&mut candidate, rule) {
                Ok(message) => {
                    debug!("Rule {} ({}) applied: {}", index + 1, rule.kind(), message);
                    working = candidate;
                    log.push(ActionLogEntry::applied(rule.kind(), message));
                }
                Err(e) => {
                    let message = format!("Skipped {}: {}", rule, skip_reason(&e));
                    warn!("Rule {} ({}) skipped: {}", index + 1, rule.kind(), e);
                    log.push(ActionLogEntry::skipped(rule.kind(), message));
                }
            }
        }

        info!(
            "Execution finished: {} rows x {} columns remain",
            working.height(),
            working.width()
        );
        (working, log)
    }

    /// Apply a single rule in place and describe its effect.
    pub fn apply(table: &mut Table, rule: &Rule) -> Result<String> {
        match rule {
            Rule::DropDuplicates { columns } => rows::drop_duplicates(table, columns.as_deref()),
            Rule::DropRowsWithMissing { column } => {
                rows::drop_rows_with_missing(table, column.as_deref())
            }
            Rule::FillMissing { column, strategy } => fill::fill_missing(table, column, strategy),
            Rule::StandardizeCase { column, case } => {
                transforms::standardize_case(table, column, *case)
            }
            Rule::StandardizeDateFormat { column, format } => {
                transforms::standardize_date_format(table, column, format)
            }
            Rule::RenameColumn { from, to } => columns::rename_column(table, from, to),
            Rule::TrimWhitespace { column } => {
                transforms::trim_whitespace(table, column.as_deref())
            }
            Rule::TypeCast { column, target } => transforms::type_cast(table, column, *target),
            Rule::DropColumns { columns } => columns::drop_columns(table, columns),
            Rule::StandardizeColumnNames => columns::standardize_column_names(table),
            Rule::FilterRows { column, op, value } => rows::filter_rows(table, column, *op, value),
        }
    }
}

fn skip_reason(error: &CleaningError) -> String {
    match error {
        CleaningError::RuleApplication { reason, .. } => reason.clone(),
        CleaningError::WithContext { source, .. } => skip_reason(source),
        other => other.to_string(),
    }
}
