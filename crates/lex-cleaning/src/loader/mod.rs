//! Dataset loading: raw delimited bytes to a typed [`Table`].
//!
//! Loading runs in fixed steps:
//!
//! 1. Size check against `max_input_bytes`
//! 2. Text decoding (UTF-8, Latin-1 fallback, BOM stripped, NUL rejected)
//! 3. Structural scan counting fields per record (ragged-row tolerance) and
//!    dropping blank records
//! 4. Parsing with the polars CSV reader, every column as text
//! 5. Header extraction and column-name checks
//! 6. Missing-value normalization and per-column type inference

mod type_inference;

pub use type_inference::infer_column_type;

use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::quality::DatasetValidator;
use crate::table::{Table, Value};
use crate::types::{ColumnMeta, ColumnType};
use crate::utils::{is_boolean_literal, parse_number};

const UTF8_BOM: char = '\u{feff}';

/// Parses raw tabular content into a [`Table`].
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    config: CleaningConfig,
}

impl DatasetLoader {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Load delimited content with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::MalformedInput`] when the content is too
    /// large, cannot be decoded, has no data rows, has duplicate column
    /// names, or has more ragged records than the configured tolerance.
    pub fn load(&self, bytes: &[u8]) -> Result<Table> {
        if bytes.len() > self.config.max_input_bytes {
            return Err(CleaningError::MalformedInput(format!(
                "input is {} bytes, the limit is {} bytes",
                bytes.len(),
                self.config.max_input_bytes
            )));
        }

        let scan = scan_records(&decode_text(bytes)?);
        if scan.field_counts.is_empty() {
            return Err(CleaningError::MalformedInput("the file is empty".to_string()));
        }
        self.check_ragged_rows(&scan.field_counts)?;

        let raw = CsvReadOptions::default()
            .with_has_header(false)
            .with_infer_schema_length(Some(0))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_quote_char(Some(b'"'))
                    .with_truncate_ragged_lines(true),
            )
            .into_reader_with_file_handle(Cursor::new(scan.text))
            .finish()
            .map_err(|e| CleaningError::MalformedInput(format!("unreadable table: {}", e)))?;

        let names = header_names(&raw)?;
        DatasetValidator::check_column_names(&names)?;

        if raw.height() < 2 {
            return Err(CleaningError::MalformedInput(
                "the file has a header but no data rows".to_string(),
            ));
        }
        let body = raw.slice(1, raw.height() - 1);

        let mut columns = Vec::with_capacity(names.len());
        for (raw_column, name) in body.get_columns().iter().zip(names) {
            let values = self.normalize_missing(raw_column.as_materialized_series())?;
            let column_type = infer_column_type(
                values.iter().flatten().map(String::as_str),
                self.config.type_sample_size,
            );
            let (column_type, cells) = convert_column(&name, column_type, values);
            debug!("Column '{}' inferred as {}", name, column_type);
            columns.push((ColumnMeta::new(name, column_type), cells));
        }

        let table = Table::from_columns(columns).context("Building table")?;
        info!(
            "Loaded {} rows x {} columns",
            table.height(),
            table.width()
        );
        Ok(table)
    }

    fn check_ragged_rows(&self, field_counts: &[usize]) -> Result<()> {
        let expected = field_counts[0];
        let records = field_counts.len() - 1;
        if records == 0 {
            return Ok(());
        }

        let ragged = field_counts[1..].iter().filter(|&&c| c != expected).count();
        if ragged == 0 {
            return Ok(());
        }

        let ratio = ragged as f64 / records as f64;
        if ratio > self.config.ragged_row_tolerance {
            return Err(CleaningError::MalformedInput(format!(
                "{} of {} rows do not have {} fields like the header",
                ragged, records, expected
            )));
        }

        warn!(
            "{} of {} rows have an inconsistent field count, within tolerance",
            ragged, records
        );
        Ok(())
    }

    /// Raw strings with missing markers turned into `None`.
    fn normalize_missing(&self, series: &Series) -> Result<Vec<Option<String>>> {
        Ok(series
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) if !self.config.is_missing_value(s) => Some(s.to_string()),
                _ => None,
            })
            .collect())
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1.
fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.contains(&0) {
        return Err(CleaningError::MalformedInput(
            "content is binary, not text".to_string(),
        ));
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            warn!("Input is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    };

    Ok(text.strip_prefix(UTF8_BOM).map(str::to_string).unwrap_or(text))
}

/// Records left after dropping blank lines, with their field counts.
struct Scan {
    text: String,
    field_counts: Vec<usize>,
}

/// Count fields per non-blank record, honoring double-quoted fields. Blank
/// records are left out of the returned text so the parser never sees them.
fn scan_records(text: &str) -> Scan {
    let mut kept = String::with_capacity(text.len());
    let mut record = String::new();
    let mut field_counts = Vec::new();
    let mut in_quotes = false;
    let mut fields = 1;
    let mut has_content = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                record.push(c);
                chars.next();
                record.push('"');
                continue;
            }
            '"' => {
                in_quotes = !in_quotes;
                has_content = true;
            }
            ',' if !in_quotes => {
                fields += 1;
                has_content = true;
            }
            '\n' if !in_quotes => {
                if has_content {
                    kept.push_str(&record);
                    kept.push('\n');
                    field_counts.push(fields);
                }
                record.clear();
                fields = 1;
                has_content = false;
                continue;
            }
            '\r' if !in_quotes => {}
            _ => has_content = true,
        }
        record.push(c);
    }
    if has_content {
        kept.push_str(&record);
        kept.push('\n');
        field_counts.push(fields);
    }

    Scan {
        text: kept,
        field_counts,
    }
}

/// Column names from the first record. Blank names become `column_<n>`.
fn header_names(raw: &DataFrame) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(raw.width());
    for (idx, column) in raw.get_columns().iter().enumerate() {
        let header = column.as_materialized_series().str()?.get(0);
        let name = match header.map(str::trim) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => format!("column_{}", idx + 1),
        };
        names.push(name);
    }
    Ok(names)
}

/// Convert raw strings to typed cells. Numeric and boolean columns whose
/// unsampled values do not parse are kept as text instead.
fn convert_column(
    name: &str,
    column_type: ColumnType,
    values: Vec<Option<String>>,
) -> (ColumnType, Vec<Value>) {
    match column_type {
        ColumnType::Numeric => {
            let parsed: Option<Vec<Value>> = values
                .iter()
                .map(|v| match v {
                    Some(s) => parse_number(s).map(Value::Number),
                    None => Some(Value::Null),
                })
                .collect();
            if let Some(cells) = parsed {
                return (ColumnType::Numeric, cells);
            }
        }
        ColumnType::Boolean => {
            if values.iter().flatten().all(|s| is_boolean_literal(s)) {
                return (ColumnType::Boolean, text_cells(values));
            }
        }
        ColumnType::Date | ColumnType::Text => return (column_type, text_cells(values)),
    }

    debug!(
        "Column '{}' has values outside its sampled type, keeping it as text",
        name
    );
    (ColumnType::Text, text_cells(values))
}

fn text_cells(values: Vec<Option<String>>) -> Vec<Value> {
    values
        .into_iter()
        .map(|v| v.map_or(Value::Null, Value::Text))
        .collect()
}
