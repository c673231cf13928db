//! In-memory table: a polars `DataFrame` plus the column metadata derived at
//! load time.
//!
//! Rules never touch the `DataFrame` directly. They read a column as a
//! vector of [`Value`] cells, transform it, and write it back with
//! [`Table::set_cells`], which rebuilds a typed `Series`.

use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::error::{CleaningError, Result};
use crate::types::{ColumnMeta, ColumnSummary, ColumnType, DatasetSummary};
use crate::utils::{format_number, parse_boolean, parse_number};

const KEY_SEPARATOR: char = '\u{1f}';

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Textual form of a present value.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
        }
    }

    /// Equality key used for duplicate detection. Values of different kinds
    /// never collide.
    fn key(&self) -> String {
        match self {
            Value::Null => "\u{0}".to_string(),
            Value::Text(s) => format!("s:{}", s),
            Value::Number(n) => format!("n:{}", n),
            Value::Bool(b) => format!("b:{}", b),
        }
    }
}

impl From<AnyValue<'_>> for Value {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(b) => Value::Bool(b),
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            AnyValue::Int8(v) => Value::Number(v as f64),
            AnyValue::Int16(v) => Value::Number(v as f64),
            AnyValue::Int32(v) => Value::Number(v as f64),
            AnyValue::Int64(v) => Value::Number(v as f64),
            AnyValue::UInt8(v) => Value::Number(v as f64),
            AnyValue::UInt16(v) => Value::Number(v as f64),
            AnyValue::UInt32(v) => Value::Number(v as f64),
            AnyValue::UInt64(v) => Value::Number(v as f64),
            AnyValue::Float32(v) => Value::Number(v as f64),
            AnyValue::Float64(v) => Value::Number(v),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Ordered columns with unique names, ordered rows, and a type per column.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
    schema: Vec<ColumnMeta>,
}

impl Table {
    /// Build a table from typed cell columns. Names must be unique and every
    /// column must have the same length.
    pub fn from_columns(columns: Vec<(ColumnMeta, Vec<Value>)>) -> Result<Self> {
        let mut frame_columns = Vec::with_capacity(columns.len());
        let mut schema = Vec::with_capacity(columns.len());
        for (meta, cells) in columns {
            let series = build_series(&meta.name, &cells, meta.column_type);
            frame_columns.push(series.into_column());
            schema.push(meta);
        }
        let df = DataFrame::new(frame_columns)?;
        Ok(Self { df, schema })
    }

    /// Wrap a `DataFrame`, deriving column types from the polars dtypes.
    pub fn from_dataframe(df: DataFrame) -> Self {
        let schema = df
            .get_columns()
            .iter()
            .map(|col| ColumnMeta::new(col.name().as_str(), column_type_of(col.dtype())))
            .collect();
        Self { df, schema }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn schema(&self) -> &[ColumnMeta] {
        &self.schema
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.iter().any(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.schema
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    fn require(&self, name: &str) -> Result<ColumnType> {
        self.column_type(name)
            .ok_or_else(|| CleaningError::ColumnNotFound(name.to_string()))
    }

    /// Read a column as cells.
    pub fn cells(&self, name: &str) -> Result<Vec<Value>> {
        self.require(name)?;
        let series = self.df.column(name)?.as_materialized_series();

        let cells = match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                .collect(),
            DataType::Boolean => series
                .bool()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Bool))
                .collect(),
            dtype if is_numeric_dtype(dtype) => series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Number))
                .collect(),
            _ => {
                let mut cells = Vec::with_capacity(series.len());
                for i in 0..series.len() {
                    cells.push(Value::from(series.get(i)?));
                }
                cells
            }
        };
        Ok(cells)
    }

    /// Replace a column's cells and record its (possibly new) type.
    pub(crate) fn set_cells(
        &mut self,
        name: &str,
        cells: Vec<Value>,
        column_type: ColumnType,
    ) -> Result<()> {
        self.require(name)?;
        if cells.len() != self.height() {
            return Err(CleaningError::rule(
                "set_cells",
                format!("expected {} cells, got {}", self.height(), cells.len()),
            ));
        }

        let series = build_series(name, &cells, column_type);
        self.df.replace(name, series)?;
        if let Some(meta) = self.schema.iter_mut().find(|c| c.name == name) {
            meta.column_type = column_type;
        }
        Ok(())
    }

    /// Keep only the rows whose mask entry is `true`, preserving order.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) -> Result<()> {
        let mask = BooleanChunked::from_slice("keep".into(), keep);
        self.df = self.df.filter(&mask)?;
        Ok(())
    }

    pub(crate) fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        let names_ref: Vec<PlSmallStr> = names.iter().map(|s| s.as_str().into()).collect();
        self.df = self.df.drop_many(names_ref);
        self.schema.retain(|c| !names.contains(&c.name));
        Ok(())
    }

    pub(crate) fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        self.require(from)?;
        self.df.rename(from, to.into())?;
        if let Some(meta) = self.schema.iter_mut().find(|c| c.name == from) {
            meta.name = to.to_string();
        }
        Ok(())
    }

    /// Rename every column at once. `names` must be unique and match the width.
    pub(crate) fn set_column_names(&mut self, names: &[String]) -> Result<()> {
        if names.len() != self.width() {
            return Err(CleaningError::rule(
                "set_column_names",
                format!("expected {} names, got {}", self.width(), names.len()),
            ));
        }
        self.df
            .set_column_names(names.iter().map(|n| PlSmallStr::from(n.as_str())))?;
        for (meta, name) in self.schema.iter_mut().zip(names) {
            meta.name = name.clone();
        }
        Ok(())
    }

    /// Number of missing cells per column.
    pub fn missing_counts(&self) -> BTreeMap<String, usize> {
        self.df
            .get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }

    /// One equality key per row over the given columns.
    pub fn row_keys(&self, columns: &[String]) -> Result<Vec<String>> {
        let mut keys = vec![String::new(); self.height()];
        for (idx, name) in columns.iter().enumerate() {
            for (key, cell) in keys.iter_mut().zip(self.cells(name)?) {
                if idx > 0 {
                    key.push(KEY_SEPARATOR);
                }
                key.push_str(&cell.key());
            }
        }
        Ok(keys)
    }

    /// Mask marking the first occurrence of every distinct key.
    pub fn first_occurrence_mask(&self, columns: &[String]) -> Result<Vec<bool>> {
        let mut seen = HashSet::with_capacity(self.height());
        Ok(self
            .row_keys(columns)?
            .into_iter()
            .map(|key| seen.insert(key))
            .collect())
    }

    /// Rows equal, over every column, to an earlier row.
    pub fn duplicate_count(&self) -> usize {
        if self.width() == 0 {
            return 0;
        }
        match self.first_occurrence_mask(&self.column_names()) {
            Ok(mask) => mask.iter().filter(|keep| !**keep).count(),
            Err(_) => 0,
        }
    }

    /// Shape and per-column overview.
    pub fn summary(&self) -> DatasetSummary {
        let rows = self.height();
        let column_summaries = self
            .schema
            .iter()
            .map(|meta| {
                let cells = self.cells(&meta.name).unwrap_or_default();
                let missing_count = cells.iter().filter(|c| c.is_missing()).count();
                let missing_percentage = if rows == 0 {
                    0.0
                } else {
                    missing_count as f64 / rows as f64 * 100.0
                };
                ColumnSummary {
                    name: meta.name.clone(),
                    column_type: meta.column_type,
                    missing_count,
                    missing_percentage,
                    sample_value: cells.iter().find_map(Value::render),
                }
            })
            .collect();

        DatasetSummary {
            rows,
            columns: self.width(),
            duplicate_rows: self.duplicate_count(),
            column_summaries,
        }
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn column_type_of(dtype: &DataType) -> ColumnType {
    match dtype {
        DataType::Boolean => ColumnType::Boolean,
        DataType::Date | DataType::Datetime(_, _) => ColumnType::Date,
        d if is_numeric_dtype(d) => ColumnType::Numeric,
        _ => ColumnType::Text,
    }
}

/// Build a typed series. Numeric columns become `Int64` when every value is
/// integral, `Float64` otherwise.
fn build_series(name: &str, cells: &[Value], column_type: ColumnType) -> Series {
    match column_type {
        ColumnType::Numeric => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Value::Number(n) => Some(*n),
                    Value::Text(s) => parse_number(s),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::Null => None,
                })
                .collect();
            let integral = values
                .iter()
                .flatten()
                .all(|v| v.fract() == 0.0 && v.abs() < 9.0e15);
            if integral {
                let ints: Vec<Option<i64>> =
                    values.iter().map(|v| v.map(|n| n as i64)).collect();
                Series::new(name.into(), ints)
            } else {
                Series::new(name.into(), values)
            }
        }
        ColumnType::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Value::Bool(b) => Some(*b),
                    Value::Text(s) => parse_boolean(s),
                    Value::Number(n) if *n == 1.0 => Some(true),
                    Value::Number(n) if *n == 0.0 => Some(false),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        ColumnType::Text | ColumnType::Date => {
            let values: Vec<Option<String>> = cells.iter().map(Value::render).collect();
            Series::new(name.into(), values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let df = df! {
            "id" => [Some(1i64), Some(1), Some(2)],
            "name" => [Some("ann"), Some("ann"), None],
            "active" => [Some(true), Some(true), Some(false)],
        }
        .unwrap();
        Table::from_dataframe(df)
    }

    #[test]
    fn test_from_dataframe_types() {
        let table = sample_table();
        assert_eq!(table.column_type("id"), Some(ColumnType::Numeric));
        assert_eq!(table.column_type("name"), Some(ColumnType::Text));
        assert_eq!(table.column_type("active"), Some(ColumnType::Boolean));
        assert_eq!(table.column_type("missing"), None);
    }

    #[test]
    fn test_from_columns() {
        let table = Table::from_columns(vec![
            (
                ColumnMeta::new("age", ColumnType::Numeric),
                vec![Value::Number(20.0), Value::Null],
            ),
            (
                ColumnMeta::new("city", ColumnType::Text),
                vec![Value::Text("Oslo".to_string()), Value::Null],
            ),
        ])
        .unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.column_names(), vec!["age", "city"]);
        assert_eq!(table.missing_counts()["city"], 1);

        let duplicate_names = Table::from_columns(vec![
            (ColumnMeta::new("a", ColumnType::Text), vec![Value::Null]),
            (ColumnMeta::new("a", ColumnType::Text), vec![Value::Null]),
        ]);
        assert!(duplicate_names.is_err());
    }

    #[test]
    fn test_cells_roundtrip_keeps_integers() {
        let mut table = sample_table();
        let cells = table.cells("id").unwrap();
        assert_eq!(cells[2], Value::Number(2.0));

        table
            .set_cells("id", cells, ColumnType::Numeric)
            .unwrap();
        assert_eq!(table.dataframe().column("id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_set_cells_float() {
        let mut table = sample_table();
        let cells = vec![Value::Number(1.5), Value::Null, Value::Number(2.0)];
        table.set_cells("id", cells, ColumnType::Numeric).unwrap();
        assert_eq!(
            table.dataframe().column("id").unwrap().dtype(),
            &DataType::Float64
        );
        assert_eq!(table.missing_counts()["id"], 1);
    }

    #[test]
    fn test_set_cells_wrong_length() {
        let mut table = sample_table();
        let result = table.set_cells("id", vec![Value::Null], ColumnType::Numeric);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicates_and_mask() {
        let table = sample_table();
        assert_eq!(table.duplicate_count(), 1);
        let mask = table.first_occurrence_mask(&["id".to_string()]).unwrap();
        assert_eq!(mask, vec![true, false, true]);
    }

    #[test]
    fn test_null_and_text_keys_differ() {
        let df = df! { "v" => [Some("\u{0}"), None] }.unwrap();
        let table = Table::from_dataframe(df);
        assert_eq!(table.duplicate_count(), 0);
    }

    #[test]
    fn test_retain_and_drop() {
        let mut table = sample_table();
        table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(table.height(), 2);

        table.drop_columns(&["active".to_string()]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert!(table.drop_columns(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_rename_updates_schema() {
        let mut table = sample_table();
        table.rename_column("name", "full_name").unwrap();
        assert!(table.has_column("full_name"));
        assert_eq!(table.column_type("full_name"), Some(ColumnType::Text));
        assert_eq!(
            table.dataframe().get_column_names()[1].as_str(),
            "full_name"
        );
    }

    #[test]
    fn test_summary() {
        let summary = sample_table().summary();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.columns, 3);
        assert_eq!(summary.duplicate_rows, 1);
        let name = &summary.column_summaries[1];
        assert_eq!(name.missing_count, 1);
        assert_eq!(name.sample_value.as_deref(), Some("ann"));
    }
}
