//! Row-removing rules. Surviving rows keep their relative order.

use crate::error::{CleaningError, Result};
use crate::rules::Comparison;
use crate::table::{Table, Value};
use crate::utils::{parse_number, pluralize};

pub(super) fn drop_duplicates(table: &mut Table, columns: Option<&[String]>) -> Result<String> {
    let subset = match columns {
        Some([]) => return Err(CleaningError::rule("drop_duplicates", "empty column subset")),
        Some(cols) => cols.to_vec(),
        None => table.column_names(),
    };
    if subset.is_empty() {
        return Ok("Removed 0 duplicate rows".to_string());
    }

    let keep = table.first_occurrence_mask(&subset)?;
    let removed = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep)?;

    let mut message = format!("Removed {}", pluralize(removed, "duplicate row"));
    if columns.is_some() {
        message.push_str(&format!(" based on [{}]", subset.join(", ")));
    }
    Ok(message)
}

pub(super) fn drop_rows_with_missing(table: &mut Table, column: Option<&str>) -> Result<String> {
    let columns = match column {
        Some(name) => vec![name.to_string()],
        None => table.column_names(),
    };

    let mut keep = vec![true; table.height()];
    for name in &columns {
        for (flag, cell) in keep.iter_mut().zip(table.cells(name)?) {
            if cell.is_missing() {
                *flag = false;
            }
        }
    }
    let removed = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep)?;

    Ok(match column {
        Some(name) => format!(
            "Removed {} with missing '{}'",
            pluralize(removed, "row"),
            name
        ),
        None => format!("Removed {} with any missing value", pluralize(removed, "row")),
    })
}

/// Keep rows where `column op value` holds. Missing cells never match.
pub(super) fn filter_rows(
    table: &mut Table,
    column: &str,
    op: Comparison,
    value: &str,
) -> Result<String> {
    let cells = table.cells(column)?;
    let literal = value.trim();
    let literal_number = parse_number(literal);

    let mut keep = Vec::with_capacity(cells.len());
    for cell in &cells {
        keep.push(matches(cell, op, literal, literal_number)?);
    }

    let before = table.height();
    table.retain_rows(&keep)?;
    let kept = table.height();

    Ok(format!(
        "Kept {} of {} where {} {} {} ({} removed)",
        kept,
        pluralize(before, "row"),
        column,
        op,
        literal,
        before - kept
    ))
}

fn matches(cell: &Value, op: Comparison, literal: &str, literal_number: Option<f64>) -> Result<bool> {
    let Some(text) = cell.render() else {
        return Ok(false);
    };

    let cell_number = match cell {
        Value::Number(n) => Some(*n),
        _ => parse_number(&text),
    };
    if let (Some(left), Some(right)) = (cell_number, literal_number) {
        return Ok(op.holds(&left, &right));
    }

    if op.is_ordering() {
        return Err(CleaningError::rule(
            "filter_rows",
            format!("cannot compare '{}' {} '{}' as numbers", text, op, literal),
        ));
    }
    Ok(op.holds(&text.as_str(), &literal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnMeta, ColumnType};
    use pretty_assertions::assert_eq;

    fn people() -> Table {
        Table::from_columns(vec![
            (
                ColumnMeta::new("name", ColumnType::Text),
                vec![
                    Value::Text("ann".to_string()),
                    Value::Text("bob".to_string()),
                    Value::Text("ann".to_string()),
                    Value::Null,
                ],
            ),
            (
                ColumnMeta::new("age", ColumnType::Numeric),
                vec![
                    Value::Number(17.0),
                    Value::Null,
                    Value::Number(40.0),
                    Value::Number(18.0),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_duplicates_subset() {
        let mut table = people();
        let message = drop_duplicates(&mut table, Some(&["name".to_string()])).unwrap();
        assert_eq!(message, "Removed 1 duplicate row based on [name]");
        assert_eq!(table.height(), 3);
        assert_eq!(table.cells("age").unwrap()[2], Value::Number(18.0));
    }

    #[test]
    fn test_drop_duplicates_idempotent() {
        let mut table = people();
        drop_duplicates(&mut table, Some(&["name".to_string()])).unwrap();
        let message = drop_duplicates(&mut table, Some(&["name".to_string()])).unwrap();
        assert_eq!(message, "Removed 0 duplicate rows based on [name]");
    }

    #[test]
    fn test_drop_duplicates_empty_subset() {
        let mut table = people();
        assert!(drop_duplicates(&mut table, Some(&[])).is_err());
    }

    #[test]
    fn test_drop_rows_with_missing() {
        let mut table = people();
        let message = drop_rows_with_missing(&mut table, Some("age")).unwrap();
        assert_eq!(message, "Removed 1 row with missing 'age'");
        assert_eq!(table.height(), 3);

        let message = drop_rows_with_missing(&mut table, None).unwrap();
        assert_eq!(message, "Removed 1 row with any missing value");
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn test_filter_numeric() {
        let mut table = people();
        let message = filter_rows(&mut table, "age", Comparison::Ge, "18").unwrap();
        assert_eq!(message, "Kept 2 of 4 rows where age >= 18 (2 removed)");
        assert_eq!(
            table.cells("age").unwrap(),
            vec![Value::Number(40.0), Value::Number(18.0)]
        );
    }

    #[test]
    fn test_filter_text_equality() {
        let mut table = people();
        filter_rows(&mut table, "name", Comparison::Ne, "ann").unwrap();
        assert_eq!(table.cells("name").unwrap(), vec![Value::Text("bob".to_string())]);
    }

    #[test]
    fn test_filter_ordering_on_text_fails() {
        let mut table = people();
        assert!(filter_rows(&mut table, "name", Comparison::Lt, "m").is_err());
    }
}
