//! Value cleaning: turns a loaded [`Table`] into normalized records.
//!
//! Column kinds are inferred over the whole column before any row is dropped:
//! a column is numeric when every present cell reads as a finite number.
//! Missing cells are filled with `0` in numeric columns and `"-"` elsewhere.
//! Coordinates and statuses are read from the raw cells, before filling, so a
//! missing coordinate is never mistaken for `0`.

use std::{
    iter::Sum,
    ops::Add,
    str::FromStr,
    sync::OnceLock,
};

use log::debug;
use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    config::DatasetConfig,
    data::CellValue,
    error::Result,
    geo::{Exclusion, GeoPoint, read_point},
    loader::{CoordinateColumns, Table, apply_renames, resolve_coordinates},
    status::{ProjectStatus, StatusNormalizer},
};

pub const TEXT_SENTINEL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Textual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Row position in the source table.
    pub position: usize,
    pub cells: Vec<CellValue>,
    pub status: ProjectStatus,
    pub geo: std::result::Result<GeoPoint, Exclusion>,
}

impl NormalizedRecord {
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub records: Vec<NormalizedRecord>,
    pub coordinates: Option<CoordinateColumns>,
    /// Rows removed because a coordinate cell was empty.
    pub dropped_rows: usize,
    pub skipped_lines: usize,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn resolve(&self, matchers: &[crate::config::ColumnMatcher]) -> Option<usize> {
        crate::config::resolve_column(&self.columns, matchers)
    }
}

pub fn clean_table(mut table: Table, config: &DatasetConfig) -> Result<CleanedTable> {
    apply_renames(&mut table, &config.coordinates.renames);
    let coordinates = resolve_coordinates(&table, &config.coordinates)?;
    let kinds = infer_column_kinds(&table);
    let status_column = table.resolve(&config.status.columns);
    let normalizer = StatusNormalizer::new(config.status.rules.clone(), config.status.unmatched);
    debug!(
        "Cleaning {} row(s); status column {:?}",
        table.len(),
        status_column.map(|idx| table.columns[idx].as_str())
    );

    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped_rows = 0usize;
    for (position, row) in table.rows.iter().enumerate() {
        let geo = match coordinates {
            Some(columns) => read_point(&row[columns.latitude], &row[columns.longitude]),
            None => Err(Exclusion::NoCoordinateColumns),
        };
        if config.drop_rows_without_coordinates && geo == Err(Exclusion::MissingCoordinate) {
            dropped_rows += 1;
            continue;
        }
        let raw_status = status_column
            .map(|idx| &row[idx])
            .filter(|cell| !cell.is_missing())
            .map(CellValue::as_display);
        let status = normalizer.normalize(raw_status.as_deref());
        let cells = row
            .iter()
            .zip(&kinds)
            .map(|(cell, kind)| fill_cell(cell, *kind))
            .collect();
        records.push(NormalizedRecord {
            position,
            cells,
            status,
            geo,
        });
    }
    if dropped_rows > 0 {
        debug!("Dropped {dropped_rows} row(s) without coordinates");
    }

    Ok(CleanedTable {
        columns: table.columns,
        kinds,
        records,
        coordinates,
        dropped_rows,
        skipped_lines: table.skipped_lines,
    })
}

pub fn infer_column_kinds(table: &Table) -> Vec<ColumnKind> {
    (0..table.columns.len())
        .map(|idx| {
            let numeric = table
                .rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|cell| !cell.is_missing())
                .all(|cell| cell.as_f64().is_some());
            if numeric {
                ColumnKind::Numeric
            } else {
                ColumnKind::Textual
            }
        })
        .collect()
}

fn fill_cell(cell: &CellValue, kind: ColumnKind) -> CellValue {
    match (kind, cell) {
        (ColumnKind::Numeric, cell) if cell.is_missing() => CellValue::Number(0.0),
        (ColumnKind::Textual, cell) if cell.is_missing() => {
            CellValue::Text(TEXT_SENTINEL.to_string())
        }
        (ColumnKind::Numeric, CellValue::Text(_)) => {
            cell.as_f64().map(CellValue::Number).unwrap_or(CellValue::Number(0.0))
        }
        (ColumnKind::Textual, CellValue::Number(n)) => {
            CellValue::Text(crate::data::format_number(*n))
        }
        _ => cell.clone(),
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid number pattern"))
}

/// Result of numeric-from-text coercion.
///
/// Stays exact while every value and the running total fit in `Decimal`, then
/// continues as an `f64` approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoercedSum {
    Exact(Decimal),
    Approximate(f64),
}

impl CoercedSum {
    pub const ZERO: CoercedSum = CoercedSum::Exact(Decimal::ZERO);

    fn from_literal(literal: &str) -> Self {
        match Decimal::from_str(literal) {
            Ok(value) => CoercedSum::Exact(value),
            Err(_) => {
                debug!("{literal} exceeds decimal range, summing as f64");
                CoercedSum::Approximate(literal.parse::<f64>().unwrap_or_default())
            }
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            CoercedSum::Exact(value) => value.to_f64().unwrap_or_default(),
            CoercedSum::Approximate(value) => value,
        }
    }

    /// Rounded to 2 decimal places, as reported in statistics.
    pub fn rounded(self) -> f64 {
        match self {
            CoercedSum::Exact(value) => value.round_dp(2).to_f64().unwrap_or_default(),
            CoercedSum::Approximate(value) => (value * 100.0).round() / 100.0,
        }
    }
}

impl Add for CoercedSum {
    type Output = CoercedSum;

    fn add(self, other: CoercedSum) -> CoercedSum {
        if let (CoercedSum::Exact(a), CoercedSum::Exact(b)) = (self, other) {
            if let Some(total) = a.checked_add(b) {
                return CoercedSum::Exact(total);
            }
            debug!("Sum of {a} and {b} exceeds decimal range, continuing as f64");
        }
        CoercedSum::Approximate(self.to_f64() + other.to_f64())
    }
}

impl Sum for CoercedSum {
    fn sum<I: Iterator<Item = CoercedSum>>(iter: I) -> CoercedSum {
        iter.fold(CoercedSum::ZERO, Add::add)
    }
}

/// Sums every integer-or-decimal substring after removing thousands separators.
///
/// `"12.5 + 3 Cr"` yields `15.5`; text without digits yields `0`. Signs are
/// not part of the pattern, so `"-4"` contributes `4`.
pub fn extract_sum(text: &str) -> CoercedSum {
    let stripped = text.replace(',', "");
    number_pattern()
        .find_iter(&stripped)
        .map(|found| CoercedSum::from_literal(found.as_str()))
        .sum()
}

/// Numeric-from-text coercion applied to a whole cell.
pub fn cell_sum(cell: &CellValue) -> CoercedSum {
    match cell {
        CellValue::Number(n) if n.is_finite() => extract_sum(&n.to_string()),
        CellValue::Text(text) => extract_sum(text),
        _ => CoercedSum::ZERO,
    }
}

/// Keeps only digits and dots, then parses; used for dam-length buckets.
///
/// Values without any digit, or that still fail to parse, read as `0`.
pub fn strip_to_number(cell: &CellValue) -> f64 {
    if let CellValue::Number(n) = cell {
        return if n.is_finite() { n.abs() } else { 0.0 };
    }
    let text = cell.as_display();
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return 0.0;
    }
    let kept = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>();
    kept.parse::<f64>().unwrap_or(0.0)
}
