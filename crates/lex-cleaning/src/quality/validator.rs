use std::collections::HashSet;

use crate::error::{CleaningError, Result};
use crate::table::Table;
use crate::types::{IssueSeverity, ValidationIssue, ValidationReport};

/// Runs structural and quality checks without mutating the table.
pub struct DatasetValidator {
    high_missing_ratio: f64,
}

impl DatasetValidator {
    pub fn new(high_missing_ratio: f64) -> Self {
        Self { high_missing_ratio }
    }

    /// Reject duplicate column names.
    pub fn check_column_names(names: &[String]) -> Result<()> {
        let mut seen = HashSet::with_capacity(names.len());
        let duplicates: Vec<&str> = names
            .iter()
            .filter(|name| !seen.insert(name.as_str()))
            .map(String::as_str)
            .collect();

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(CleaningError::MalformedInput(format!(
                "duplicate column names: {}",
                duplicates.join(", ")
            )))
        }
    }

    /// Validate a table. Issues come out in check order: table shape first,
    /// then column names, then missing values in column order.
    pub fn validate(&self, table: &Table) -> ValidationReport {
        let mut issues = Vec::new();
        let rows = table.height();

        if rows == 0 {
            issues.push(ValidationIssue {
                severity: IssueSeverity::Warning,
                column: None,
                message: "The table has no rows".to_string(),
            });
        }

        for name in table.column_names() {
            if is_unnamed(&name) {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Info,
                    column: Some(name.clone()),
                    message: format!("Column '{}' has no meaningful name", name),
                });
            }
        }

        if rows > 0 {
            for (name, missing) in missing_in_schema_order(table) {
                let ratio = missing as f64 / rows as f64;
                if missing == rows {
                    issues.push(ValidationIssue {
                        severity: IssueSeverity::Warning,
                        column: Some(name.clone()),
                        message: format!("Column '{}' is entirely missing", name),
                    });
                } else if ratio > self.high_missing_ratio {
                    issues.push(ValidationIssue {
                        severity: IssueSeverity::Info,
                        column: Some(name.clone()),
                        message: format!(
                            "Column '{}' is {:.1}% missing ({} of {} rows)",
                            name,
                            ratio * 100.0,
                            missing,
                            rows
                        ),
                    });
                }
            }
        }

        let is_valid = !issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Warning);

        ValidationReport { is_valid, issues }
    }
}

impl Default for DatasetValidator {
    fn default() -> Self {
        Self::new(0.5)
    }
}

fn missing_in_schema_order(table: &Table) -> Vec<(String, usize)> {
    let counts = table.missing_counts();
    table
        .column_names()
        .into_iter()
        .map(|name| {
            let missing = counts.get(&name).copied().unwrap_or(0);
            (name, missing)
        })
        .collect()
}

fn is_unnamed(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("unnamed")
        || lower
            .strip_prefix("column_")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
