use std::fmt;

use serde::{Deserialize, Serialize};

/// One cell of a loaded table.
///
/// Serializes untagged so the table bundle carries plain JSON numbers,
/// strings, and `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Builds a cell from raw delimited text; blank fields become [`CellValue::Empty`].
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(_) => false,
        }
    }

    /// Reads the cell as a finite float, the way a coordinate is read.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderCase {
    /// Trim and lower-case every header.
    Lower,
    /// Trim only.
    #[default]
    Preserve,
}

impl HeaderCase {
    pub fn apply(self, header: &str) -> String {
        let trimmed = header.trim();
        match self {
            HeaderCase::Lower => trimmed.to_lowercase(),
            HeaderCase::Preserve => trimmed.to_string(),
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let rendered = format!("{value:.4}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_treats_blank_as_empty() {
        assert_eq!(CellValue::from_text(""), CellValue::Empty);
        assert_eq!(CellValue::from_text(" "), CellValue::Text(" ".into()));
    }

    #[test]
    fn as_f64_rejects_non_finite_and_garbage() {
        assert_eq!(CellValue::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(CellValue::Text("NaN".into()).as_f64(), None);
        assert_eq!(CellValue::Text("inf".into()).as_f64(), None);
        assert_eq!(CellValue::Text("12N".into()).as_f64(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Empty.as_f64(), None);
    }

    #[test]
    fn header_case_trims_and_optionally_lowercases() {
        assert_eq!(HeaderCase::Lower.apply("  Project_Name "), "project_name");
        assert_eq!(HeaderCase::Preserve.apply(" Project Name "), "Project Name");
    }

    #[test]
    fn format_number_drops_trailing_zeros() {
        assert_eq!(format_number(1200.0), "1200");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.12345), "0.1235");
    }

    #[test]
    fn cells_serialize_untagged() {
        let row = vec![
            CellValue::Number(3.0),
            CellValue::Text("Dam".into()),
            CellValue::Empty,
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, "[3.0,\"Dam\",null]");
    }
}
