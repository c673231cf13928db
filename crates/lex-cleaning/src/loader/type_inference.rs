//! Type inference over a sample of non-missing column values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ColumnType;
use crate::utils::{is_boolean_literal, is_date_string, parse_number};

// Cheap shape check before handing a value to the chrono patterns.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9 ,./:T-]+$").expect("Invalid regex: date shape")
});

static HAS_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("Invalid regex: year"));

/// Infer a column type from its non-missing values.
///
/// The first `sample_size` values are checked in order: numeric, then date,
/// then boolean, otherwise text. A column with no values is text.
pub fn infer_column_type<'a, I>(values: I, sample_size: usize) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let sample: Vec<&str> = values.into_iter().take(sample_size).collect();
    if sample.is_empty() {
        return ColumnType::Text;
    }

    if sample.iter().all(|v| parse_number(v).is_some()) {
        ColumnType::Numeric
    } else if sample.iter().all(|v| looks_like_date(v)) {
        ColumnType::Date
    } else if sample.iter().all(|v| is_boolean_literal(v)) {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn looks_like_date(value: &str) -> bool {
    let trimmed = value.trim();
    DATE_SHAPE.is_match(trimmed) && HAS_YEAR.is_match(trimmed) && is_date_string(trimmed)
}
