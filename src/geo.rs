//! Coordinate filtering and map point construction.
//!
//! Every record yields a [`PointOutcome`]: either a [`MapPoint`] ready for an
//! external mapping library or the reason it was left off the map. Excluded
//! rows stay in the table and statistics.

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use crate::{
    clean::{CleanedTable, NormalizedRecord},
    config::{DatasetConfig, PopupField},
    data::CellValue,
    status::{Palette, ProjectStatus},
};

pub const MISSING_LABEL: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    #[error("no coordinate columns")]
    NoCoordinateColumns,
    #[error("missing coordinate")]
    MissingCoordinate,
    #[error("unparsable coordinates ({latitude}, {longitude})")]
    UnparsableCoordinate { latitude: String, longitude: String },
}

/// Reads a coordinate pair; both cells must hold finite numbers.
pub fn read_point(latitude: &CellValue, longitude: &CellValue) -> Result<GeoPoint, Exclusion> {
    if latitude.is_missing() || longitude.is_missing() {
        return Err(Exclusion::MissingCoordinate);
    }
    match (latitude.as_f64(), longitude.as_f64()) {
        (Some(lat), Some(lon)) => Ok(GeoPoint {
            latitude: lat,
            longitude: lon,
        }),
        _ => Err(Exclusion::UnparsableCoordinate {
            latitude: latitude.as_display(),
            longitude: longitude.as_display(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub id: usize,
    pub point: GeoPoint,
    pub color: String,
    pub status: ProjectStatus,
    pub name: String,
    pub label_fields: Vec<LabelField>,
    pub popup_html: String,
    pub tooltip_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PointOutcome {
    Included(MapPoint),
    Excluded { id: usize, reason: Exclusion },
}

impl PointOutcome {
    pub fn point(&self) -> Option<&MapPoint> {
        match self {
            PointOutcome::Included(point) => Some(point),
            PointOutcome::Excluded { .. } => None,
        }
    }
}

/// Column lookups resolved once per table.
struct PopupLayout<'a> {
    name: Option<usize>,
    fields: Vec<(&'a PopupField, Option<usize>)>,
}

impl<'a> PopupLayout<'a> {
    fn new(table: &CleanedTable, config: &'a DatasetConfig) -> Self {
        Self {
            name: table.resolve(&config.fields.name),
            fields: config
                .popup
                .iter()
                .map(|field| (field, table.resolve(&field.columns)))
                .collect(),
        }
    }
}

pub fn display_or_missing(record: &NormalizedRecord, column: Option<usize>) -> String {
    column
        .map(|idx| record.cell(idx).as_display())
        .unwrap_or_else(|| MISSING_LABEL.to_string())
}

/// One outcome per record, in record order. `records` must belong to `table`.
pub fn build_point_outcomes<'a, I>(
    table: &CleanedTable,
    records: I,
    config: &DatasetConfig,
    palette: &Palette,
) -> Vec<PointOutcome>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let layout = PopupLayout::new(table, config);
    records
        .into_iter()
        .map(|record| match &record.geo {
            Ok(point) => PointOutcome::Included(build_point(record, *point, &layout, palette)),
            Err(reason) => PointOutcome::Excluded {
                id: record.position,
                reason: reason.clone(),
            },
        })
        .collect()
}

pub fn map_points(outcomes: &[PointOutcome]) -> Vec<MapPoint> {
    outcomes
        .iter()
        .filter_map(PointOutcome::point)
        .cloned()
        .collect()
}

fn build_point(
    record: &NormalizedRecord,
    point: GeoPoint,
    layout: &PopupLayout<'_>,
    palette: &Palette,
) -> MapPoint {
    let color = palette.color_for(&record.status).to_string();
    let name = display_or_missing(record, layout.name);
    let label_fields = layout
        .fields
        .iter()
        .map(|(field, column)| {
            let value = if field.status {
                record.status.label().to_string()
            } else {
                display_or_missing(record, *column)
            };
            LabelField {
                label: field.label.clone(),
                value: format!(
                    "{}{}{}",
                    field.prefix.as_deref().unwrap_or_default(),
                    value,
                    field.suffix.as_deref().unwrap_or_default()
                ),
            }
        })
        .collect::<Vec<_>>();
    let popup_html = render_popup(&name, &color, &label_fields);
    let tooltip_html = format!(
        "<b>{}</b><br><i>{}</i>",
        escape_html(&name),
        escape_html(record.status.label())
    );
    MapPoint {
        id: record.position,
        point,
        color,
        status: record.status.clone(),
        name,
        label_fields,
        popup_html,
        tooltip_html,
    }
}

fn render_popup(name: &str, color: &str, fields: &[LabelField]) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<div style=\"font-family:'Segoe UI';min-width:300px;\">\
         <div style=\"background:{color};color:white;padding:8px;border-radius:6px 6px 0 0;\">\
         <h4 style=\"margin:0;\">{}</h4></div><div style=\"padding:8px;\">",
        escape_html(name)
    );
    for field in fields {
        let _ = write!(
            html,
            "<p><b>{}:</b> {}</p>",
            escape_html(&field.label),
            escape_html(&field.value)
        );
    }
    html.push_str("</div></div>");
    html
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
