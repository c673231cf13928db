//! The rule vocabulary.
//!
//! A [`Rule`] is a pure description of one cleaning operation. It never
//! refers to a table instance, so a [`RuleSet`] compiled once can be
//! replayed against any table with compatible columns.
//!
//! Rules serialize with an `action` tag:
//!
//! ```json
//! [
//!   {"action": "drop_duplicates", "columns": null},
//!   {"action": "fill_missing", "column": "Age", "strategy": {"method": "median"}}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ColumnType;

// ============================================================================
// Rule Parameters
// ============================================================================

/// How `fill_missing` chooses replacement values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FillStrategy {
    /// A literal, converted to the column type.
    Constant { value: String },
    Mean,
    Median,
    /// Most frequent value; ties go to the value seen first.
    Mode,
    /// Propagate the previous non-missing value. A leading missing run stays missing.
    ForwardFill,
    /// Propagate the next non-missing value. A trailing missing run stays missing.
    BackwardFill,
}

impl FillStrategy {
    /// Whether the strategy only applies to numeric columns.
    pub fn requires_numeric(&self) -> bool {
        matches!(self, FillStrategy::Mean | FillStrategy::Median)
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillStrategy::Constant { value } => write!(f, "constant '{}'", value),
            FillStrategy::Mean => f.write_str("mean"),
            FillStrategy::Median => f.write_str("median"),
            FillStrategy::Mode => f.write_str("mode"),
            FillStrategy::ForwardFill => f.write_str("forward fill"),
            FillStrategy::BackwardFill => f.write_str("backward fill"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    Lower,
    Upper,
    Title,
}

impl CaseStyle {
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "lower" | "lowercase" | "lower case" => Some(CaseStyle::Lower),
            "upper" | "uppercase" | "upper case" => Some(CaseStyle::Upper),
            "title" | "titlecase" | "title case" | "proper" => Some(CaseStyle::Title),
            _ => None,
        }
    }
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStyle::Lower => f.write_str("lower"),
            CaseStyle::Upper => f.write_str("upper"),
            CaseStyle::Title => f.write_str("title"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
}

impl TargetType {
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "integers" | "whole number" => Some(TargetType::Integer),
            "float" | "decimal" | "number" | "numeric" | "double" => Some(TargetType::Float),
            "str" | "string" | "text" => Some(TargetType::Text),
            "bool" | "boolean" => Some(TargetType::Boolean),
            "date" | "datetime" | "timestamp" => Some(TargetType::Date),
            _ => None,
        }
    }

    /// Column type a successful cast produces.
    pub fn column_type(&self) -> ColumnType {
        match self {
            TargetType::Integer | TargetType::Float => ColumnType::Numeric,
            TargetType::Text => ColumnType::Text,
            TargetType::Boolean => ColumnType::Boolean,
            TargetType::Date => ColumnType::Date,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Integer => f.write_str("integer"),
            TargetType::Float => f.write_str("float"),
            TargetType::Text => f.write_str("text"),
            TargetType::Boolean => f.write_str("boolean"),
            TargetType::Date => f.write_str("date"),
        }
    }
}

/// Comparison used by `filter_rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    /// Parse a symbol or a common English spelling, with or without a
    /// leading "is".
    pub fn parse(op: &str) -> Option<Self> {
        let lower = op.trim().to_ascii_lowercase();
        let phrase = lower.strip_prefix("is ").unwrap_or(&lower);
        match phrase {
            "=" | "==" | "is" | "equals" | "equal to" => Some(Comparison::Eq),
            "!=" | "<>" | "not" | "not equal to" => Some(Comparison::Ne),
            "<" | "less than" | "fewer than" | "lower than" | "below" | "under" => {
                Some(Comparison::Lt)
            }
            "<=" | "at most" | "less than or equal to" => Some(Comparison::Le),
            ">" | "greater than" | "more than" | "higher than" | "above" | "over" => {
                Some(Comparison::Gt)
            }
            ">=" | "at least" | "greater than or equal to" => Some(Comparison::Ge),
            _ => None,
        }
    }

    /// The comparison that holds exactly when this one does not.
    pub fn negate(&self) -> Self {
        match self {
            Comparison::Eq => Comparison::Ne,
            Comparison::Ne => Comparison::Eq,
            Comparison::Lt => Comparison::Ge,
            Comparison::Le => Comparison::Gt,
            Comparison::Gt => Comparison::Le,
            Comparison::Ge => Comparison::Lt,
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparison::Eq | Comparison::Ne)
    }

    pub fn holds<T: PartialOrd>(&self, left: &T, right: &T) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// Rule
// ============================================================================

/// One cleaning operation. The set of variants is the whole vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Rule {
    /// Keep the first occurrence of each distinct row over `columns` (all when `None`).
    DropDuplicates { columns: Option<Vec<String>> },
    /// Remove rows missing a value in `column` (any column when `None`).
    DropRowsWithMissing { column: Option<String> },
    FillMissing {
        column: String,
        strategy: FillStrategy,
    },
    StandardizeCase { column: String, case: CaseStyle },
    /// Reformat dates using a chrono format string.
    StandardizeDateFormat { column: String, format: String },
    RenameColumn { from: String, to: String },
    /// Strip surrounding whitespace in `column` (all text columns when `None`).
    TrimWhitespace { column: Option<String> },
    TypeCast { column: String, target: TargetType },
    DropColumns { columns: Vec<String> },
    StandardizeColumnNames,
    /// Keep rows where `column op value` holds.
    FilterRows {
        column: String,
        op: Comparison,
        value: String,
    },
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::DropDuplicates { .. } => RuleKind::DropDuplicates,
            Rule::DropRowsWithMissing { .. } => RuleKind::DropRowsWithMissing,
            Rule::FillMissing { .. } => RuleKind::FillMissing,
            Rule::StandardizeCase { .. } => RuleKind::StandardizeCase,
            Rule::StandardizeDateFormat { .. } => RuleKind::StandardizeDateFormat,
            Rule::RenameColumn { .. } => RuleKind::RenameColumn,
            Rule::TrimWhitespace { .. } => RuleKind::TrimWhitespace,
            Rule::TypeCast { .. } => RuleKind::TypeCast,
            Rule::DropColumns { .. } => RuleKind::DropColumns,
            Rule::StandardizeColumnNames => RuleKind::StandardizeColumnNames,
            Rule::FilterRows { .. } => RuleKind::FilterRows,
        }
    }

    /// Whether applying the rule can remove rows.
    pub fn removes_rows(&self) -> bool {
        matches!(
            self,
            Rule::DropDuplicates { .. } | Rule::DropRowsWithMissing { .. } | Rule::FilterRows { .. }
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::DropDuplicates { columns: None } => f.write_str("drop duplicate rows"),
            Rule::DropDuplicates {
                columns: Some(cols),
            } => write!(f, "drop duplicate rows by [{}]", cols.join(", ")),
            Rule::DropRowsWithMissing { column: None } => {
                f.write_str("drop rows with any missing value")
            }
            Rule::DropRowsWithMissing {
                column: Some(col),
            } => write!(f, "drop rows with missing '{}'", col),
            Rule::FillMissing { column, strategy } => {
                write!(f, "fill missing '{}' with {}", column, strategy)
            }
            Rule::StandardizeCase { column, case } => {
                write!(f, "convert '{}' to {} case", column, case)
            }
            Rule::StandardizeDateFormat { column, format } => {
                write!(f, "format dates in '{}' as {}", column, format)
            }
            Rule::RenameColumn { from, to } => write!(f, "rename '{}' to '{}'", from, to),
            Rule::TrimWhitespace { column: None } => f.write_str("trim whitespace in text columns"),
            Rule::TrimWhitespace {
                column: Some(col),
            } => write!(f, "trim whitespace in '{}'", col),
            Rule::TypeCast { column, target } => write!(f, "cast '{}' to {}", column, target),
            Rule::DropColumns { columns } => write!(f, "drop columns [{}]", columns.join(", ")),
            Rule::StandardizeColumnNames => f.write_str("standardize column names"),
            Rule::FilterRows { column, op, value } => {
                write!(f, "keep rows where {} {} {}", column, op, value)
            }
        }
    }
}

/// Discriminant of [`Rule`], used in logs and in the compiler vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    DropDuplicates,
    DropRowsWithMissing,
    FillMissing,
    StandardizeCase,
    StandardizeDateFormat,
    RenameColumn,
    TrimWhitespace,
    TypeCast,
    DropColumns,
    StandardizeColumnNames,
    FilterRows,
}

impl RuleKind {
    pub const ALL: [RuleKind; 11] = [
        RuleKind::DropDuplicates,
        RuleKind::DropRowsWithMissing,
        RuleKind::FillMissing,
        RuleKind::StandardizeCase,
        RuleKind::StandardizeDateFormat,
        RuleKind::RenameColumn,
        RuleKind::TrimWhitespace,
        RuleKind::TypeCast,
        RuleKind::DropColumns,
        RuleKind::StandardizeColumnNames,
        RuleKind::FilterRows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::DropDuplicates => "drop_duplicates",
            RuleKind::DropRowsWithMissing => "drop_rows_with_missing",
            RuleKind::FillMissing => "fill_missing",
            RuleKind::StandardizeCase => "standardize_case",
            RuleKind::StandardizeDateFormat => "standardize_date_format",
            RuleKind::RenameColumn => "rename_column",
            RuleKind::TrimWhitespace => "trim_whitespace",
            RuleKind::TypeCast => "type_cast",
            RuleKind::DropColumns => "drop_columns",
            RuleKind::StandardizeColumnNames => "standardize_column_names",
            RuleKind::FilterRows => "filter_rows",
        }
    }

    /// Look up an operation name, accepting a few common synonyms.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        if let Some(kind) = Self::ALL.iter().find(|k| k.as_str() == normalized) {
            return Some(*kind);
        }
        match normalized.as_str() {
            "remove_duplicates" | "deduplicate" => Some(RuleKind::DropDuplicates),
            "drop_missing" | "drop_na" | "dropna" => Some(RuleKind::DropRowsWithMissing),
            "fill_na" | "fillna" | "impute" => Some(RuleKind::FillMissing),
            "change_case" => Some(RuleKind::StandardizeCase),
            "format_date" | "standardize_dates" => Some(RuleKind::StandardizeDateFormat),
            "rename" | "rename_columns" => Some(RuleKind::RenameColumn),
            "trim" | "strip_whitespace" => Some(RuleKind::TrimWhitespace),
            "convert_dtype" | "cast" | "convert_type" => Some(RuleKind::TypeCast),
            "drop_column" | "remove_columns" => Some(RuleKind::DropColumns),
            "standardize_columns" | "clean_column_names" => Some(RuleKind::StandardizeColumnNames),
            "filter" | "keep_rows" => Some(RuleKind::FilterRows),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RuleSet
// ============================================================================

/// Ordered rules; each rule sees the output of the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn kinds(&self) -> Vec<RuleKind> {
        self.0.iter().map(Rule::kind).collect()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self(rules)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rule_serialization_shape() {
        let rule = Rule::FillMissing {
            column: "Age".to_string(),
            strategy: FillStrategy::Median,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "fill_missing",
                "column": "Age",
                "strategy": {"method": "median"}
            })
        );
    }

    #[test]
    fn test_rule_deserialization() {
        let json = r#"[
            {"action": "drop_duplicates", "columns": null},
            {"action": "standardize_column_names"},
            {"action": "filter_rows", "column": "age", "op": ">=", "value": "18"},
            {"action": "fill_missing", "column": "city", "strategy": {"method": "constant", "value": "Unknown"}}
        ]"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(
            rules.kinds(),
            vec![
                RuleKind::DropDuplicates,
                RuleKind::StandardizeColumnNames,
                RuleKind::FilterRows,
                RuleKind::FillMissing
            ]
        );
        assert_eq!(
            rules.rules()[2],
            Rule::FilterRows {
                column: "age".to_string(),
                op: Comparison::Ge,
                value: "18".to_string()
            }
        );
    }

    #[test]
    fn test_rule_kind_names_are_unique_and_resolvable() {
        for kind in RuleKind::ALL {
            assert_eq!(RuleKind::from_name(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(RuleKind::from_name("remove duplicates"), Some(RuleKind::DropDuplicates));
        assert_eq!(RuleKind::from_name("convert_dtype"), Some(RuleKind::TypeCast));
        assert_eq!(RuleKind::from_name("explode"), None);
    }

    #[test]
    fn test_comparison_negate_and_holds() {
        assert_eq!(Comparison::Lt.negate(), Comparison::Ge);
        assert_eq!(Comparison::Eq.negate(), Comparison::Ne);
        for op in [
            Comparison::Eq,
            Comparison::Ne,
            Comparison::Lt,
            Comparison::Le,
            Comparison::Gt,
            Comparison::Ge,
        ] {
            assert_eq!(op.negate().negate(), op);
            assert_ne!(op.holds(&1.0, &2.0), op.negate().holds(&1.0, &2.0));
        }
        assert_eq!(Comparison::parse("less than"), Some(Comparison::Lt));
        assert_eq!(Comparison::parse(">="), Some(Comparison::Ge));
    }

    #[test]
    fn test_comparison_parse_english() {
        let cases = [
            ("at least", Comparison::Ge),
            ("at most", Comparison::Le),
            ("above", Comparison::Gt),
            ("over", Comparison::Gt),
            ("higher than", Comparison::Gt),
            ("below", Comparison::Lt),
            ("under", Comparison::Lt),
            ("lower than", Comparison::Lt),
            ("greater than or equal to", Comparison::Ge),
            ("not equal to", Comparison::Ne),
        ];
        for (phrase, op) in cases {
            assert_eq!(Comparison::parse(phrase), Some(op), "{}", phrase);
            assert_eq!(Comparison::parse(&format!("is {}", phrase)), Some(op), "is {}", phrase);
        }
        assert_eq!(Comparison::parse("is"), Some(Comparison::Eq));
        assert_eq!(Comparison::parse("is not"), Some(Comparison::Ne));
        assert_eq!(Comparison::parse("sort of"), None);
    }

    #[test]
    fn test_parameter_parsing() {
        assert_eq!(CaseStyle::parse("UPPERCASE"), Some(CaseStyle::Upper));
        assert_eq!(TargetType::parse("int"), Some(TargetType::Integer));
        assert_eq!(TargetType::parse("datetime"), Some(TargetType::Date));
        assert_eq!(TargetType::parse("blob"), None);
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::RenameColumn {
            from: "Age".to_string(),
            to: "age_years".to_string(),
        };
        assert_eq!(rule.to_string(), "rename 'Age' to 'age_years'");
        assert!(Rule::DropDuplicates { columns: None }.removes_rows());
        assert!(!rule.removes_rows());
    }
}
