//! `fill_missing`.

use std::collections::HashMap;

use crate::error::{CleaningError, Result};
use crate::rules::FillStrategy;
use crate::table::{Table, Value};
use crate::types::ColumnType;
use crate::utils::{format_number, parse_boolean, parse_number, pluralize};

pub(super) fn fill_missing(table: &mut Table, column: &str, strategy: &FillStrategy) -> Result<String> {
    let column_type = table
        .column_type(column)
        .ok_or_else(|| CleaningError::ColumnNotFound(column.to_string()))?;
    if strategy.requires_numeric() && column_type != ColumnType::Numeric {
        return Err(CleaningError::rule(
            "fill_missing",
            format!("{} needs a numeric column, '{}' is {}", strategy, column, column_type),
        ));
    }

    let mut cells = table.cells(column)?;
    let missing_before = cells.iter().filter(|c| c.is_missing()).count();
    if missing_before == 0 {
        return Ok(format!("No missing values to fill in '{}'", column));
    }

    let description = match strategy {
        FillStrategy::Constant { value } => {
            let fill = constant_for(column, column_type, value)?;
            replace_missing(&mut cells, &fill);
            format!("'{}'", value)
        }
        FillStrategy::Mean => {
            let values = numbers(&cells);
            if values.is_empty() {
                return Err(no_values(column, "mean"));
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            replace_missing(&mut cells, &Value::Number(mean));
            format!("mean ({})", format_number(mean))
        }
        FillStrategy::Median => {
            let median = median(numbers(&cells)).ok_or_else(|| no_values(column, "median"))?;
            replace_missing(&mut cells, &Value::Number(median));
            format!("median ({})", format_number(median))
        }
        FillStrategy::Mode => {
            let mode = mode(&cells).ok_or_else(|| no_values(column, "mode"))?;
            let shown = mode.render().unwrap_or_default();
            replace_missing(&mut cells, &mode);
            format!("mode ('{}')", shown)
        }
        FillStrategy::ForwardFill => {
            let mut last: Option<Value> = None;
            for cell in cells.iter_mut() {
                if cell.is_missing() {
                    if let Some(prev) = &last {
                        *cell = prev.clone();
                    }
                } else {
                    last = Some(cell.clone());
                }
            }
            "forward fill".to_string()
        }
        FillStrategy::BackwardFill => {
            let mut next: Option<Value> = None;
            for cell in cells.iter_mut().rev() {
                if cell.is_missing() {
                    if let Some(following) = &next {
                        *cell = following.clone();
                    }
                } else {
                    next = Some(cell.clone());
                }
            }
            "backward fill".to_string()
        }
    };

    let missing_after = cells.iter().filter(|c| c.is_missing()).count();
    table.set_cells(column, cells, column_type)?;

    let mut message = format!(
        "Filled {} in '{}' with {}",
        pluralize(missing_before - missing_after, "missing value"),
        column,
        description
    );
    if missing_after > 0 {
        message.push_str(&format!("; {} still missing", missing_after));
    }
    Ok(message)
}

fn no_values(column: &str, what: &str) -> CleaningError {
    CleaningError::rule(
        "fill_missing",
        format!("'{}' has no values to compute the {} from", column, what),
    )
}

fn replace_missing(cells: &mut [Value], fill: &Value) {
    for cell in cells.iter_mut().filter(|c| c.is_missing()) {
        *cell = fill.clone();
    }
}

/// The literal converted to the column's type.
fn constant_for(column: &str, column_type: ColumnType, literal: &str) -> Result<Value> {
    match column_type {
        ColumnType::Numeric => parse_number(literal).map(Value::Number).ok_or_else(|| {
            CleaningError::rule(
                "fill_missing",
                format!("'{}' is not a number but '{}' is numeric", literal, column),
            )
        }),
        ColumnType::Boolean => parse_boolean(literal).map(Value::Bool).ok_or_else(|| {
            CleaningError::rule(
                "fill_missing",
                format!("'{}' is not a boolean but '{}' is boolean", literal, column),
            )
        }),
        ColumnType::Text | ColumnType::Date => Ok(Value::Text(literal.to_string())),
    }
}

fn numbers(cells: &[Value]) -> Vec<f64> {
    cells.iter().filter_map(Value::as_number).collect()
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent present value; ties go to the value seen first.
fn mode(cells: &[Value]) -> Option<Value> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (index, cell) in cells.iter().enumerate() {
        if let Some(key) = cell.render() {
            counts.entry(key).or_insert((index, 0)).1 += 1;
        }
    }
    counts
        .values()
        .max_by(|(first_a, count_a), (first_b, count_b)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(first, _)| cells[*first].clone())
}
