//! CSV ingest for cumulative-count series.
//!
//! Design goals:
//! - **Strict schema** for the date and value columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No repair**: the surviving rows must already form a valid series

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::TimeSeries;
use crate::error::AppError;

/// Which columns hold the date and the cumulative count.
#[derive(Debug, Clone)]
pub struct CsvSpec {
    pub date_column: String,
    pub value_column: String,
}

impl Default for CsvSpec {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            value_column: "count".to_string(),
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: validated series plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: TimeSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Open `path` and read a series from it.
pub fn load_series(path: &Path, spec: &CsvSpec) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_series(file, spec)
}

/// Read a series from any CSV source with a header row.
///
/// Rows are ordered by date before validation, so the file itself may be
/// unsorted. Gaps, duplicates and decreasing counts are still rejected.
pub fn read_series<R: Read>(source: R, spec: &CsvSpec) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = column_index(&header_map, &spec.date_column)?;
    let value_idx = column_index(&header_map, &spec.value_column)?;

    let mut records: Vec<(NaiveDate, f64)> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, date_idx, value_idx, spec));
        match parsed {
            Ok(rec) => records.push(rec),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::new(2, "No valid rows in CSV."));
    }

    records.sort_by_key(|(date, _)| *date);
    let series = TimeSeries::from_records(&records)?;

    Ok(IngestedSeries {
        series,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")))
}

fn parse_row(
    record: &StringRecord,
    date_idx: usize,
    value_idx: usize,
    spec: &CsvSpec,
) -> Result<(NaiveDate, f64), String> {
    let date = parse_date(get_required(record, date_idx, &spec.date_column)?)?;
    let raw = get_required(record, value_idx, &spec.value_column)?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{}` value '{raw}'.", spec.value_column))?;
    if !value.is_finite() {
        return Err(format!("Non-finite `{}` value.", spec.value_column));
    }
    Ok((date, value))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO first; a few common spreadsheet layouts are accepted as well.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}
