use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::rules::{RuleKind, RuleSet};
use crate::table::Table;

// ============================================================================
// Schema Types
// ============================================================================

/// Column type inferred once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and inferred type of a column. The compiler only ever sees these,
/// never cell values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Which compiler strategy produced a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Ai,
    Pattern,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Ai => f.write_str("ai"),
            StrategyKind::Pattern => f.write_str("pattern"),
        }
    }
}

// ============================================================================
// Validation Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Fails the verdict, cleaning may still proceed.
    Warning,
    /// Informational only.
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

/// Outcome of the quality checks over a freshly loaded table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }
}

// ============================================================================
// Execution Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Applied,
    Skipped,
}

/// One entry of the audit trail, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub kind: RuleKind,
    pub status: ActionStatus,
    pub message: String,
}

impl ActionLogEntry {
    pub fn applied(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: ActionStatus::Applied,
            message: message.into(),
        }
    }

    pub fn skipped(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: ActionStatus::Skipped,
            message: message.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ActionStatus::Skipped
    }
}

impl fmt::Display for ActionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Before/after metrics of a cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
    pub columns_before: usize,
    /// Column count of the transformed table.
    pub columns: usize,
    /// Full-row duplicates present in the original table.
    pub duplicate_rows: usize,
    pub duplicate_rows_removed: usize,
    pub missing_counts_before: BTreeMap<String, usize>,
    pub missing_counts_after: BTreeMap<String, usize>,
}

impl CleaningStats {
    pub fn total_missing_before(&self) -> usize {
        self.missing_counts_before.values().sum()
    }

    pub fn total_missing_after(&self) -> usize {
        self.missing_counts_after.values().sum()
    }
}

/// Everything a cleaning run hands to the presentation and storage layers.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningResult {
    #[serde(skip)]
    pub table: Table,
    pub rules: RuleSet,
    pub action_log: Vec<ActionLogEntry>,
    pub stats: CleaningStats,
    pub strategy: StrategyKind,
    pub warnings: Vec<String>,
    /// Quality checks over the input table.
    pub validation: ValidationReport,
}

impl CleaningResult {
    pub fn skipped_count(&self) -> usize {
        self.action_log.iter().filter(|e| e.is_skipped()).count()
    }
}

// ============================================================================
// Dataset Summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub column_type: ColumnType,
    pub missing_count: usize,
    pub missing_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_value: Option<String>,
}

/// Shape and per-column overview of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub duplicate_rows: usize,
    pub column_summaries: Vec<ColumnSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_serialization() {
        let json = serde_json::to_string(&ColumnType::Numeric).unwrap();
        assert_eq!(json, "\"numeric\"");
        let parsed: ColumnType = serde_json::from_str("\"boolean\"").unwrap();
        assert_eq!(parsed, ColumnType::Boolean);
    }

    #[test]
    fn test_strategy_kind_display() {
        assert_eq!(StrategyKind::Ai.to_string(), "ai");
        assert_eq!(StrategyKind::Pattern.to_string(), "pattern");
        assert_eq!(
            serde_json::to_string(&StrategyKind::Pattern).unwrap(),
            "\"pattern\""
        );
    }

    #[test]
    fn test_action_log_entry() {
        let entry = ActionLogEntry::skipped(RuleKind::TrimWhitespace, "Skipped trim_whitespace");
        assert!(entry.is_skipped());
        assert_eq!(entry.to_string(), "Skipped trim_whitespace");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "trim_whitespace");
        assert_eq!(json["status"], "skipped");
    }

    #[test]
    fn test_stats_totals() {
        let mut stats = CleaningStats::default();
        stats.missing_counts_before.insert("a".to_string(), 2);
        stats.missing_counts_before.insert("b".to_string(), 3);
        stats.missing_counts_after.insert("a".to_string(), 0);
        assert_eq!(stats.total_missing_before(), 5);
        assert_eq!(stats.total_missing_after(), 0);
    }

    #[test]
    fn test_validation_report_messages() {
        let report = ValidationReport {
            is_valid: false,
            issues: vec![ValidationIssue {
                severity: IssueSeverity::Warning,
                column: Some("notes".to_string()),
                message: "Column 'notes' is entirely missing".to_string(),
            }],
        };
        assert_eq!(report.messages(), vec!["Column 'notes' is entirely missing"]);
    }
}
