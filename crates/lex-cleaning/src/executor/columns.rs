//! Column-level rules: renames and drops.

use crate::error::{CleaningError, Result};
use crate::table::Table;
use crate::utils::{pluralize, standardize_names};

pub(super) fn rename_column(table: &mut Table, from: &str, to: &str) -> Result<String> {
    if !table.has_column(from) {
        return Err(CleaningError::ColumnNotFound(from.to_string()));
    }
    let to = to.trim();
    if to.is_empty() {
        return Err(CleaningError::rule("rename_column", "new name is empty"));
    }
    if from == to {
        return Ok(format!("Column '{}' already has that name; nothing renamed", from));
    }
    if table.has_column(to) {
        return Err(CleaningError::rule(
            "rename_column",
            format!("a column named '{}' already exists", to),
        ));
    }

    table.rename_column(from, to)?;
    Ok(format!("Renamed '{}' to '{}'", from, to))
}

pub(super) fn drop_columns(table: &mut Table, columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        return Err(CleaningError::rule("drop_columns", "no columns given"));
    }
    if let Some(unknown) = columns.iter().find(|c| !table.has_column(c)) {
        return Err(CleaningError::ColumnNotFound(unknown.clone()));
    }

    let mut unique: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        if !unique.contains(column) {
            unique.push(column.clone());
        }
    }
    table.drop_columns(&unique)?;

    Ok(format!(
        "Dropped {}: {}",
        pluralize(unique.len(), "column"),
        unique.join(", ")
    ))
}

pub(super) fn standardize_column_names(table: &mut Table) -> Result<String> {
    let current = table.column_names();
    let renamed = standardize_names(&current);
    let changed = current.iter().zip(&renamed).filter(|(a, b)| a != b).count();

    if changed > 0 {
        table.set_column_names(&renamed)?;
    }
    Ok(format!("Standardized {}", pluralize(changed, "column name")))
}
