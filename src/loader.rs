//! Table loading from spreadsheets and delimited text.
//!
//! Both formats produce a [`Table`] whose headers are trimmed (and optionally
//! lower-cased), de-duplicated, and never empty. Delimited files tolerate
//! malformed lines: lines with extra fields or undecodable bytes are skipped,
//! short lines are padded with empty cells.

use std::{collections::BTreeMap, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::Timelike;
use log::{debug, warn};

use crate::{
    config::{ColumnMatcher, CoordinateConfig, SourceConfig, SourceFormat, resolve_column},
    data::{CellValue, format_number},
    error::{DashboardError, Result},
    io_utils,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Delimited lines dropped while loading.
    pub skipped_lines: usize,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            skipped_lines: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn resolve(&self, matchers: &[ColumnMatcher]) -> Option<usize> {
        resolve_column(&self.columns, matchers)
    }
}

pub fn load_table(path: &Path, source: &SourceConfig) -> Result<Table> {
    if !path.is_file() {
        return Err(DashboardError::load(path, "File not found"));
    }
    let format = io_utils::resolve_source_format(path, source.format);
    debug!("Loading {path:?} as {format:?}");
    let (headers, rows, skipped_lines) = match format {
        SourceFormat::Xlsx => {
            let (headers, rows) = read_spreadsheet(path)?;
            (headers, rows, 0)
        }
        SourceFormat::Csv => {
            let ((headers, rows), skipped) = read_delimited(path, source)?;
            (headers, rows, skipped)
        }
    };
    let columns = normalize_headers(
        headers
            .iter()
            .map(|header| source.header_case.apply(header))
            .collect(),
    );
    Ok(Table {
        columns,
        rows,
        skipped_lines,
    })
}

type RawTable = (Vec<String>, Vec<Vec<CellValue>>);

fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|err| DashboardError::load(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::load(path, "Workbook contains no worksheets"))?
        .map_err(|err| DashboardError::load(path, err))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| DashboardError::load(path, "No columns to parse from file"))?;
    let headers = header_row.iter().map(spreadsheet_header).collect::<Vec<_>>();
    let width = headers.len();

    let mut records = Vec::new();
    for row in rows {
        let mut cells = row.iter().map(spreadsheet_cell).collect::<Vec<_>>();
        if cells.iter().all(CellValue::is_missing) {
            continue;
        }
        cells.resize(width, CellValue::Empty);
        records.push(cells);
    }
    Ok((headers, records))
}

fn spreadsheet_header(cell: &Data) -> String {
    match spreadsheet_cell(cell) {
        CellValue::Number(n) => format_number(n),
        CellValue::Text(text) => text,
        CellValue::Empty => String::new(),
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(moment) if moment.num_seconds_from_midnight() == 0 => {
                CellValue::Text(moment.format("%Y-%m-%d").to_string())
            }
            Some(moment) => CellValue::Text(moment.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_text(s),
        _ => CellValue::Empty,
    }
}

fn read_delimited(path: &Path, source: &SourceConfig) -> Result<(RawTable, usize)> {
    let encoding = io_utils::resolve_encoding(source.encoding.as_deref())
        .map_err(|err| DashboardError::load(path, err))?;
    let delimiter = io_utils::resolve_input_delimiter(path, source.delimiter)
        .map_err(|err| DashboardError::load(path, err))?;
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)
        .map_err(|err| DashboardError::load(path, format!("{err:#}")))?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .map_err(|err| DashboardError::load(path, format!("{err:#}")))?;
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DashboardError::load(path, "No columns to parse from file"));
    }
    let width = headers.len();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (row_idx, record) in reader.byte_records().enumerate() {
        let line = row_idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!("Skipping line {line} in {path:?}: {err}");
                skipped += 1;
                continue;
            }
        };
        if record.len() > width {
            warn!(
                "Skipping line {line} in {path:?}: expected {width} field(s), saw {}",
                record.len()
            );
            skipped += 1;
            continue;
        }
        let decoded = match io_utils::decode_record(&record, encoding) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("Skipping line {line} in {path:?}: {err}");
                skipped += 1;
                continue;
            }
        };
        let mut cells = decoded
            .iter()
            .map(|field| CellValue::from_text(field))
            .collect::<Vec<_>>();
        cells.resize(width, CellValue::Empty);
        rows.push(cells);
    }
    Ok(((headers, rows), skipped))
}

/// Names blank headers `Unnamed: N` and suffixes repeats with `.1`, `.2`, ...
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut normalized = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };
        let mut candidate = base.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{base}.{count}");
        }
        seen.insert(candidate.clone(), 0);
        normalized.push(candidate);
    }
    normalized
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub latitude: usize,
    pub longitude: usize,
}

/// Renames misspelled headers (e.g. `logitude`) when the canonical name is absent.
pub fn apply_renames(table: &mut Table, renames: &BTreeMap<String, String>) {
    for (from, to) in renames {
        let has_canonical = table
            .columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(to));
        if has_canonical {
            continue;
        }
        if let Some(column) = table
            .columns
            .iter_mut()
            .find(|column| column.eq_ignore_ascii_case(from))
        {
            debug!("Renaming column '{column}' to '{to}'");
            *column = to.clone();
        }
    }
}

/// Locates the latitude/longitude columns.
///
/// Returns `Ok(None)` when they are absent and not required.
pub fn resolve_coordinates(
    table: &Table,
    config: &CoordinateConfig,
) -> Result<Option<CoordinateColumns>> {
    let latitude = table.resolve(&config.latitude);
    let longitude = table.resolve(&config.longitude);
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            debug!(
                "Coordinates resolved to '{}' / '{}'",
                table.columns[latitude], table.columns[longitude]
            );
            Ok(Some(CoordinateColumns {
                latitude,
                longitude,
            }))
        }
        _ if config.required => Err(DashboardError::Schema {
            found: table.columns.clone(),
        }),
        _ => Ok(None),
    }
}
