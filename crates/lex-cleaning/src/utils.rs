//! Shared helpers for value parsing and formatting.
//!
//! The loader and the executor must agree on what counts as a number, a
//! boolean or a date, so both go through these functions.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: non-word characters"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace"));
static UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("Invalid regex: underscores"));

// =============================================================================
// Numeric Parsing
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Parse a plain number. Used by type inference, where `"$5"` is text.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a number, tolerating currency, percent and thousands formatting.
/// Used by explicit casts.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a number the way it would be typed: integral values without a
/// fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Boolean Parsing
// =============================================================================

/// Literals a column must be limited to for boolean inference.
pub const INFERRED_BOOLEAN_VALUES: [&str; 6] = ["true", "false", "yes", "no", "0", "1"];

/// Common boolean true representations accepted by casts.
pub const BOOLEAN_TRUE_VALUES: [&str; 6] = ["true", "yes", "1", "t", "y", "on"];

/// Common boolean false representations accepted by casts.
pub const BOOLEAN_FALSE_VALUES: [&str; 6] = ["false", "no", "0", "f", "n", "off"];

/// Check if a string is one of the boolean literals recognized at load time.
pub fn is_boolean_literal(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    INFERRED_BOOLEAN_VALUES.contains(&lower.as_str())
}

/// Parse a boolean from any of the accepted true/false spellings.
pub fn parse_boolean(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_VALUES.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

// =============================================================================
// Date Parsing
// =============================================================================

/// Recognized date-only patterns, tried in order. Month-first wins for
/// ambiguous slash dates.
pub const DATE_PATTERNS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%B %d, %Y",
];

/// Recognized date-time patterns, tried after the date-only ones.
pub const DATETIME_PATTERNS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a date or date-time using the recognized patterns.
///
/// Dates without a time component are placed at midnight.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for pattern in DATE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, pattern) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    DATETIME_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(trimmed, pattern).ok())
}

pub fn is_date_string(s: &str) -> bool {
    parse_date(s).is_some()
}

/// Parse with one pattern. Date-only patterns land at midnight.
pub fn parse_date_with(s: &str, pattern: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    NaiveDateTime::parse_from_str(trimmed, pattern).ok().or_else(|| {
        NaiveDate::parse_from_str(trimmed, pattern)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

/// The date patterns a column is written in, most common first.
///
/// Patterns are ranked by how many values they read, ties going to the
/// earlier pattern. A pattern that only swaps day and month of a
/// higher-ranked one is dropped, so `03/04/2024` is read the same way as
/// `25/12/2024` in the same column.
pub fn detect_date_patterns<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let values: Vec<&str> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    let mut ranked: Vec<(&'static str, usize)> = DATE_PATTERNS
        .iter()
        .chain(DATETIME_PATTERNS.iter())
        .map(|&pattern| {
            let hits = values
                .iter()
                .filter(|v| parse_date_with(v, pattern).is_some())
                .count();
            (pattern, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut shapes: Vec<String> = Vec::new();
    let mut patterns = Vec::new();
    for (pattern, _) in ranked {
        let shape = pattern.replace("%d", "%_").replace("%m", "%_");
        if !shapes.contains(&shape) {
            shapes.push(shape);
            patterns.push(pattern);
        }
    }
    patterns
}

/// Parse with the first of `patterns` that fits.
pub fn parse_date_in(s: &str, patterns: &[&str]) -> Option<NaiveDateTime> {
    patterns.iter().find_map(|pattern| parse_date_with(s, pattern))
}

/// Check that a chrono format string contains only known specifiers.
pub fn is_valid_date_format(format: &str) -> bool {
    !format.trim().is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// Format a date-time, returning `None` when the format needs data a naive
/// date-time does not carry (such as `%z`).
pub fn format_date(value: &NaiveDateTime, format: &str) -> Option<String> {
    if !is_valid_date_format(format) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", value.format(format)).ok()?;
    Some(out)
}

// =============================================================================
// Text Helpers
// =============================================================================

/// `"1 row"`, `"3 rows"`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Capitalize the first letter of every whitespace-separated word and
/// lowercase the rest. Whitespace is kept as-is.
pub fn to_title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Snake-case a single column name: lowercase, punctuation removed,
/// whitespace to `_`, repeated `_` collapsed, surrounding `_` trimmed.
pub fn standardize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, "");
    let joined = WHITESPACE.replace_all(stripped.trim(), "_");
    let collapsed = UNDERSCORES.replace_all(&joined, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "column".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Standardize every name, suffixing `_1`, `_2`, ... on collisions so the
/// result stays unique. Order is preserved.
pub fn standardize_names(names: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    names
        .iter()
        .map(|name| {
            let base = standardize_name(name);
            let mut candidate = base.clone();
            let mut suffix = 1;
            while used.contains(&candidate) {
                candidate = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("€100"), "100");
        assert_eq!(clean_numeric_string("1 000"), "1000");
    }

    #[test]
    fn test_parse_number_is_strict() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" -3.5 "), Some(-3.5));
        assert_eq!(parse_number("$5"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("hello"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_boolean_parsing() {
        assert!(is_boolean_literal("TRUE"));
        assert!(is_boolean_literal("no"));
        assert!(is_boolean_literal("1"));
        assert!(!is_boolean_literal("y"));
        assert_eq!(parse_boolean("Yes"), Some(true));
        assert_eq!(parse_boolean("off"), Some(false));
        assert_eq!(parse_boolean("maybe"), None);
    }

    #[test]
    fn test_parse_date_patterns() {
        let iso = parse_date("2024-01-15").unwrap();
        assert_eq!((iso.year(), iso.month(), iso.day()), (2024, 1, 15));

        let us = parse_date("01/15/2024").unwrap();
        assert_eq!((us.month(), us.day()), (1, 15));

        // Not a valid month-first date, so day-first applies
        let eu = parse_date("15/01/2024").unwrap();
        assert_eq!((eu.month(), eu.day()), (1, 15));

        assert!(parse_date("Jan 15, 2024").is_some());
        assert!(parse_date("2024-01-15 10:30:00").is_some());
        assert!(parse_date("2024-01-15T10:30:00").is_some());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("42").is_none());
    }

    #[test]
    fn test_detect_day_first_column() {
        let patterns = detect_date_patterns(["03/04/2024", "25/12/2024", ""]);
        assert_eq!(patterns, vec!["%d/%m/%Y"]);

        let first = parse_date_in("03/04/2024", &patterns).unwrap();
        assert_eq!((first.month(), first.day()), (4, 3));
    }

    #[test]
    fn test_detect_mixed_shapes() {
        let patterns = detect_date_patterns(["2024-01-05", "2024-02-29", "03/15/2024", "soon"]);
        assert_eq!(patterns, vec!["%Y-%m-%d", "%m/%d/%Y"]);

        // Ambiguous alone: month-first wins the tie
        assert_eq!(detect_date_patterns(["03/04/2024"]), vec!["%m/%d/%Y"]);
        assert!(detect_date_patterns(["soon", " "]).is_empty());
    }

    #[test]
    fn test_parse_date_with_datetime_pattern() {
        let dt = parse_date_with("2024-01-15 10:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!((dt.day(), dt.hour()), (15, 10));
        assert!(parse_date_with("2024-01-15", "%Y-%m-%d %H:%M:%S").is_none());
    }

    #[test]
    fn test_date_format_validation() {
        assert!(is_valid_date_format("%Y-%m-%d"));
        assert!(is_valid_date_format("%d/%m/%Y"));
        assert!(!is_valid_date_format("%Q"));
        assert!(!is_valid_date_format(""));
    }

    #[test]
    fn test_format_date() {
        let value = parse_date("2024-03-05").unwrap();
        assert_eq!(format_date(&value, "%d/%m/%Y"), Some("05/03/2024".to_string()));
        assert_eq!(format_date(&value, "%Y%m%d"), Some("20240305".to_string()));
        assert_eq!(format_date(&value, "%z"), None);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "duplicate row"), "1 duplicate row");
        assert_eq!(pluralize(0, "duplicate row"), "0 duplicate rows");
        assert_eq!(pluralize(3, "value"), "3 values");
    }

    #[test]
    fn test_standardize_name() {
        assert_eq!(standardize_name("First Name"), "first_name");
        assert_eq!(standardize_name("  E-mail Address! "), "email_address");
        assert_eq!(standardize_name("Total ($)"), "total");
        assert_eq!(standardize_name("a__b"), "a_b");
        assert_eq!(standardize_name("???"), "column");
    }

    #[test]
    fn test_standardize_names_collisions() {
        let names = vec![
            "First Name".to_string(),
            "first_name".to_string(),
            "FIRST NAME".to_string(),
            "age".to_string(),
        ];
        assert_eq!(
            standardize_names(&names),
            vec!["first_name", "first_name_1", "first_name_2", "age"]
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(to_title_case("hello WORLD"), "Hello World");
        assert_eq!(to_title_case("  new  york "), "  New  York ");
    }
}
