//! Value-level rules: case, dates, whitespace and casts.

use chrono::Timelike;

use crate::error::{CleaningError, Result};
use crate::rules::{CaseStyle, TargetType};
use crate::table::{Table, Value};
use crate::types::ColumnType;
use crate::utils::{
    detect_date_patterns, format_date, is_valid_date_format, parse_boolean, parse_date_in,
    parse_numeric_string, pluralize, to_title_case,
};

fn require_type(table: &Table, column: &str) -> Result<ColumnType> {
    table
        .column_type(column)
        .ok_or_else(|| CleaningError::ColumnNotFound(column.to_string()))
}

pub(super) fn standardize_case(table: &mut Table, column: &str, case: CaseStyle) -> Result<String> {
    let column_type = require_type(table, column)?;
    if column_type != ColumnType::Text {
        return Err(CleaningError::rule(
            "standardize_case",
            format!("'{}' is a {} column, not text", column, column_type),
        ));
    }

    let mut changed = 0;
    let cells: Vec<Value> = table
        .cells(column)?
        .into_iter()
        .map(|cell| match cell {
            Value::Text(s) => {
                let converted = match case {
                    CaseStyle::Lower => s.to_lowercase(),
                    CaseStyle::Upper => s.to_uppercase(),
                    CaseStyle::Title => to_title_case(&s),
                };
                if converted != s {
                    changed += 1;
                }
                Value::Text(converted)
            }
            other => other,
        })
        .collect();
    table.set_cells(column, cells, column_type)?;

    Ok(format!(
        "Converted {} in '{}' to {} case",
        pluralize(changed, "value"),
        column,
        case
    ))
}

/// Reparse dates with the patterns detected for the column and write them in
/// `format`. Values that do not parse are left as they are.
pub(super) fn standardize_date_format(table: &mut Table, column: &str, format: &str) -> Result<String> {
    require_type(table, column)?;
    if !is_valid_date_format(format) {
        return Err(CleaningError::rule(
            "standardize_date_format",
            format!("'{}' is not a valid date format", format),
        ));
    }

    let mut converted = 0;
    let mut unconverted = 0;
    let mut cells = table.cells(column)?;
    let rendered: Vec<Option<String>> = cells.iter().map(Value::render).collect();
    let patterns = detect_date_patterns(rendered.iter().flatten().map(String::as_str));

    for (cell, text) in cells.iter_mut().zip(rendered) {
        let Some(text) = text else {
            continue;
        };
        match parse_date_in(&text, &patterns).and_then(|dt| format_date(&dt, format)) {
            Some(formatted) => {
                *cell = Value::Text(formatted);
                converted += 1;
            }
            None => {
                *cell = Value::Text(text);
                unconverted += 1;
            }
        }
    }

    if converted == 0 && unconverted > 0 {
        return Err(CleaningError::rule(
            "standardize_date_format",
            format!("no value in '{}' is a recognized date", column),
        ));
    }
    table.set_cells(column, cells, ColumnType::Date)?;

    Ok(format!(
        "Reformatted {} in '{}' as {} ({} unconverted)",
        pluralize(converted, "date"),
        column,
        format,
        unconverted
    ))
}

/// Strip surrounding whitespace in one column, or in every text and date
/// column when none is named.
pub(super) fn trim_whitespace(table: &mut Table, column: Option<&str>) -> Result<String> {
    let columns: Vec<(String, ColumnType)> = match column {
        Some(name) => {
            let column_type = require_type(table, name)?;
            if !matches!(column_type, ColumnType::Text | ColumnType::Date) {
                return Err(CleaningError::rule(
                    "trim_whitespace",
                    format!("'{}' is a {} column, not text", name, column_type),
                ));
            }
            vec![(name.to_string(), column_type)]
        }
        None => table
            .schema()
            .iter()
            .filter(|c| matches!(c.column_type, ColumnType::Text | ColumnType::Date))
            .map(|c| (c.name.clone(), c.column_type))
            .collect(),
    };

    let mut trimmed = 0;
    for (name, column_type) in &columns {
        let cells: Vec<Value> = table
            .cells(name)?
            .into_iter()
            .map(|cell| match cell {
                Value::Text(s) if s.trim().len() != s.len() => {
                    trimmed += 1;
                    Value::Text(s.trim().to_string())
                }
                other => other,
            })
            .collect();
        table.set_cells(name, cells, *column_type)?;
    }

    Ok(match column {
        Some(name) => format!("Trimmed whitespace in {} of '{}'", pluralize(trimmed, "value"), name),
        None => format!(
            "Trimmed whitespace in {} across {}",
            pluralize(trimmed, "value"),
            pluralize(columns.len(), "text column")
        ),
    })
}

/// Convert a column. Values that cannot be converted become missing.
pub(super) fn type_cast(table: &mut Table, column: &str, target: TargetType) -> Result<String> {
    require_type(table, column)?;
    let cells = table.cells(column)?;
    let present_before = cells.iter().filter(|c| !c.is_missing()).count();

    let date_patterns = if target == TargetType::Date {
        let rendered: Vec<String> = cells.iter().filter_map(Value::render).collect();
        detect_date_patterns(rendered.iter().map(String::as_str))
    } else {
        Vec::new()
    };
    let converted: Vec<Value> = cells
        .into_iter()
        .map(|cell| cast_value(cell, target, &date_patterns))
        .collect();
    let present_after = converted.iter().filter(|c| !c.is_missing()).count();
    table.set_cells(column, converted, target.column_type())?;

    let lost = present_before - present_after;
    Ok(format!(
        "Cast '{}' to {}; {} became missing",
        column,
        target,
        pluralize(lost, "value")
    ))
}

fn cast_value(cell: Value, target: TargetType, date_patterns: &[&str]) -> Value {
    if cell.is_missing() {
        return Value::Null;
    }
    let converted = match target {
        TargetType::Integer => as_number(&cell).map(|n| Value::Number(n.trunc())),
        TargetType::Float => as_number(&cell).map(Value::Number),
        TargetType::Text => cell.render().map(Value::Text),
        TargetType::Boolean => match &cell {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Number(n) if *n == 1.0 => Some(Value::Bool(true)),
            Value::Number(n) if *n == 0.0 => Some(Value::Bool(false)),
            Value::Text(s) => parse_boolean(s).map(Value::Bool),
            _ => None,
        },
        TargetType::Date => cell
            .render()
            .and_then(|s| parse_date_in(&s, date_patterns))
            .and_then(|dt| {
                let format = if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    "%Y-%m-%d"
                } else {
                    "%Y-%m-%d %H:%M:%S"
                };
                format_date(&dt, format)
            })
            .map(Value::Text),
    };
    converted.unwrap_or(Value::Null)
}

fn as_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_numeric_string(s),
        Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnMeta;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn table(column_type: ColumnType, cells: Vec<Value>) -> Table {
        Table::from_columns(vec![(ColumnMeta::new("c", column_type), cells)]).unwrap()
    }

    #[test]
    fn test_title_case() {
        let mut t = table(ColumnType::Text, vec![text("jane DOE"), Value::Null, text("Bo")]);
        let message = standardize_case(&mut t, "c", CaseStyle::Title).unwrap();
        assert_eq!(message, "Converted 1 value in 'c' to title case");
        assert_eq!(t.cells("c").unwrap(), vec![text("Jane Doe"), Value::Null, text("Bo")]);
    }

    #[test]
    fn test_case_on_numeric_is_rejected() {
        let mut t = table(ColumnType::Numeric, vec![Value::Number(1.0)]);
        assert!(standardize_case(&mut t, "c", CaseStyle::Upper).is_err());
    }

    #[test]
    fn test_date_format_counts_unconverted() {
        let mut t = table(
            ColumnType::Text,
            vec![text("2024-01-05"), text("03/15/2024"), text("soon"), Value::Null],
        );
        let message = standardize_date_format(&mut t, "c", "%d.%m.%Y").unwrap();
        assert_eq!(message, "Reformatted 2 dates in 'c' as %d.%m.%Y (1 unconverted)");
        assert_eq!(
            t.cells("c").unwrap(),
            vec![text("05.01.2024"), text("15.03.2024"), text("soon"), Value::Null]
        );
        assert_eq!(t.column_type("c"), Some(ColumnType::Date));
    }

    #[test]
    fn test_date_format_reads_column_day_first() {
        let mut t = table(
            ColumnType::Text,
            vec![text("03/04/2024"), text("25/12/2024"), text("soon")],
        );
        let message = standardize_date_format(&mut t, "c", "%Y-%m-%d").unwrap();
        assert_eq!(message, "Reformatted 2 dates in 'c' as %Y-%m-%d (1 unconverted)");
        assert_eq!(
            t.cells("c").unwrap(),
            vec![text("2024-04-03"), text("2024-12-25"), text("soon")]
        );
    }

    #[test]
    fn test_cast_to_date_reads_column_day_first() {
        let mut t = table(ColumnType::Text, vec![text("03/04/2024"), text("25/12/2024")]);
        type_cast(&mut t, "c", TargetType::Date).unwrap();
        assert_eq!(
            t.cells("c").unwrap(),
            vec![text("2024-04-03"), text("2024-12-25")]
        );
    }

    #[test]
    fn test_trim_all_text_columns() {
        let mut t = Table::from_columns(vec![
            (
                ColumnMeta::new("a", ColumnType::Text),
                vec![text("  x "), text("y")],
            ),
            (
                ColumnMeta::new("n", ColumnType::Numeric),
                vec![Value::Number(1.0), Value::Number(2.0)],
            ),
        ])
        .unwrap();
        let message = trim_whitespace(&mut t, None).unwrap();
        assert_eq!(message, "Trimmed whitespace in 1 value across 1 text column");
        assert_eq!(t.cells("a").unwrap(), vec![text("x"), text("y")]);
    }

    #[test]
    fn test_cast_to_integer_truncates_and_counts_losses() {
        let mut t = table(
            ColumnType::Text,
            vec![text("3.7"), text("$1,200"), text("n/a?"), Value::Null],
        );
        let message = type_cast(&mut t, "c", TargetType::Integer).unwrap();
        assert_eq!(message, "Cast 'c' to integer; 1 value became missing");
        assert_eq!(
            t.cells("c").unwrap(),
            vec![Value::Number(3.0), Value::Number(1200.0), Value::Null, Value::Null]
        );
        assert_eq!(t.column_type("c"), Some(ColumnType::Numeric));
    }

    #[test]
    fn test_cast_to_boolean() {
        let mut t = table(ColumnType::Text, vec![text("Yes"), text("off"), text("maybe")]);
        type_cast(&mut t, "c", TargetType::Boolean).unwrap();
        assert_eq!(
            t.cells("c").unwrap(),
            vec![Value::Bool(true), Value::Bool(false), Value::Null]
        );
    }
}
