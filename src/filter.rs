//! Optional record filters selected per request (dam type and dam length).
//!
//! Conditions combine with logical AND. Filtering narrows the working record
//! set only; option lists for selectors come from the unfiltered table.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::{
    clean::{CleanedTable, NormalizedRecord, strip_to_number},
    config::FilterConfig,
};

/// Selector value meaning "no filter".
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DamLengthBucket {
    UpTo1000,
    From1000To2000,
    Over2000,
}

impl DamLengthBucket {
    pub fn label(self) -> &'static str {
        match self {
            DamLengthBucket::UpTo1000 => "0-1000",
            DamLengthBucket::From1000To2000 => "1000-2000",
            DamLengthBucket::Over2000 => "2000+",
        }
    }

    pub fn contains(self, length: f64) -> bool {
        match self {
            DamLengthBucket::UpTo1000 => length <= 1000.0,
            DamLengthBucket::From1000To2000 => length > 1000.0 && length <= 2000.0,
            DamLengthBucket::Over2000 => length > 2000.0,
        }
    }

    /// Parses a selector value; `all` and blank mean no bucket.
    pub fn parse_selector(value: &str) -> Result<Option<Self>> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for DamLengthBucket {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "0-1000" => Ok(DamLengthBucket::UpTo1000),
            "1000-2000" => Ok(DamLengthBucket::From1000To2000),
            "2000+" | "2000_plus" | "2000plus" => Ok(DamLengthBucket::Over2000),
            other => Err(anyhow!(
                "Unknown dam length range '{other}' (expected 0-1000, 1000-2000, 2000+ or all)"
            )),
        }
    }
}

impl fmt::Display for DamLengthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<DamLengthBucket> for String {
    fn from(value: DamLengthBucket) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// Case-insensitive substring match on the type column.
    DamType(String),
    DamLength(DamLengthBucket),
}

/// Raw selector values as received from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dam_length: Option<String>,
}

impl FilterSelection {
    pub fn is_empty(&self) -> bool {
        self.dam_type.is_none() && self.dam_length.is_none()
    }

    pub fn parse(&self) -> Result<Vec<FilterCondition>> {
        let mut conditions = Vec::new();
        if let Some(dam_type) = &self.dam_type {
            let trimmed = dam_type.trim();
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(ALL) {
                conditions.push(FilterCondition::DamType(trimmed.to_lowercase()));
            }
        }
        if let Some(dam_length) = &self.dam_length {
            if let Some(bucket) = DamLengthBucket::parse_selector(dam_length)? {
                conditions.push(FilterCondition::DamLength(bucket));
            }
        }
        Ok(conditions)
    }
}

/// Conditions bound to resolved column positions.
#[derive(Debug, Clone)]
pub struct BoundFilters {
    type_column: Option<usize>,
    length_column: Option<usize>,
    conditions: Vec<FilterCondition>,
}

impl BoundFilters {
    pub fn bind(
        table: &CleanedTable,
        config: Option<&FilterConfig>,
        conditions: Vec<FilterCondition>,
    ) -> Self {
        Self {
            type_column: config.and_then(|c| table.resolve(&c.type_column)),
            length_column: config.and_then(|c| table.resolve(&c.length_column)),
            conditions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn length_column(&self) -> Option<usize> {
        self.length_column
    }

    pub fn dam_length(&self, record: &NormalizedRecord) -> f64 {
        self.length_column
            .map(|column| strip_to_number(record.cell(column)))
            .unwrap_or_default()
    }

    pub fn evaluate(&self, record: &NormalizedRecord) -> bool {
        self.conditions
            .iter()
            .all(|condition| self.evaluate_condition(condition, record))
    }

    fn evaluate_condition(&self, condition: &FilterCondition, record: &NormalizedRecord) -> bool {
        match condition {
            FilterCondition::DamType(needle) => self
                .type_column
                .map(|column| {
                    record
                        .cell(column)
                        .as_display()
                        .to_lowercase()
                        .contains(needle.as_str())
                })
                .unwrap_or(false),
            FilterCondition::DamLength(bucket) => bucket.contains(self.dam_length(record)),
        }
    }

    pub fn apply<'a>(&self, table: &'a CleanedTable) -> Vec<&'a NormalizedRecord> {
        table
            .records
            .iter()
            .filter(|record| self.evaluate(record))
            .collect()
    }
}
