//! The load → clean → filter → aggregate pipeline behind every dashboard.
//!
//! [`build_view`] never fails on data. A load failure yields a failed view and
//! a missing coordinate schema yields a placeholder map, so the caller can
//! always render something. Only an invalid filter selection is an error.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    clean::{CleanedTable, NormalizedRecord, clean_table},
    config::{DashboardConfig, DatasetConfig, MapSettings},
    data::CellValue,
    error::DashboardError,
    filter::{BoundFilters, FilterCondition, FilterSelection},
    frequency::distinct_values,
    geo::{MapPoint, PointOutcome, build_point_outcomes, display_or_missing, map_points},
    loader::load_table,
    stats::{StatisticsSummary, summarize},
    status::{Palette, ProjectStatus},
};

pub const NO_COORDINATES_MESSAGE: &str = "No valid coordinates found in data.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapOutput {
    Points {
        settings: MapSettings,
        points: Vec<MapPoint>,
    },
    /// Shown in place of the map when there is nothing to plot.
    Placeholder { message: String },
    Error { message: String },
}

impl MapOutput {
    pub fn points(&self) -> &[MapPoint] {
        match self {
            MapOutput::Points { points, .. } => points,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEntry {
    pub id: usize,
    pub name: String,
    pub status: ProjectStatus,
    pub color: String,
    pub amount: String,
    pub hectares: String,
    pub region: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub districts: String,
    pub purpose: String,
    pub dpr_date: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dam_length: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub skipped_lines: usize,
    pub dropped_rows: usize,
    pub excluded_points: usize,
}

/// Everything a template needs to render one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub id: String,
    pub title: String,
    pub map: MapOutput,
    pub stats: StatisticsSummary,
    pub projects: Vec<ProjectEntry>,
    pub columns: Vec<String>,
    pub table_data: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dam_types: Vec<String>,
    pub selected: FilterSelection,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DashboardView {
    fn empty(dataset: &DatasetConfig, selection: &FilterSelection, map: MapOutput) -> Self {
        Self {
            id: dataset.id.clone(),
            title: dataset.title.clone(),
            map,
            stats: StatisticsSummary::default(),
            projects: Vec::new(),
            columns: Vec::new(),
            table_data: Vec::new(),
            dam_types: Vec::new(),
            selected: selection.clone(),
            diagnostics: Diagnostics::default(),
            error: None,
        }
    }

    /// The full-page error state for an unreadable source.
    pub fn failed(dataset: &DatasetConfig, selection: &FilterSelection, message: String) -> Self {
        let mut view = Self::empty(
            dataset,
            selection,
            MapOutput::Error {
                message: message.clone(),
            },
        );
        view.error = Some(message);
        view
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A cleaned dataset with filters bound to its columns.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub table: CleanedTable,
    /// Distinct type values from the unfiltered source.
    pub dam_types: Vec<String>,
    pub filters: BoundFilters,
}

impl PreparedDataset {
    pub fn selected(&self) -> Vec<&NormalizedRecord> {
        self.filters.apply(&self.table)
    }
}

pub fn prepare(
    config: &DashboardConfig,
    dataset: &DatasetConfig,
    conditions: Vec<FilterCondition>,
) -> crate::error::Result<PreparedDataset> {
    let path = config.source_path(dataset);
    let table = load_table(&path, &dataset.source)?;
    debug!(
        "Loaded {} row(s) with {} column(s) from {path:?}",
        table.len(),
        table.columns.len()
    );
    let dam_types = dataset
        .filters
        .as_ref()
        .and_then(|filters| table.resolve(&filters.type_column))
        .map(|column| distinct_values(&table, column))
        .unwrap_or_default();
    let cleaned = clean_table(table, dataset)?;
    let filters = BoundFilters::bind(&cleaned, dataset.filters.as_ref(), conditions);
    Ok(PreparedDataset {
        table: cleaned,
        dam_types,
        filters,
    })
}

pub fn build_view(
    config: &DashboardConfig,
    dataset: &DatasetConfig,
    selection: &FilterSelection,
) -> Result<DashboardView> {
    let conditions = selection
        .parse()
        .with_context(|| format!("Parsing filters for dataset '{}'", dataset.id))?;
    let view = match prepare(config, dataset, conditions) {
        Ok(prepared) => assemble(config, dataset, selection, &prepared),
        Err(err @ DashboardError::Schema { .. }) => {
            warn!("{}: {err}", dataset.id);
            DashboardView::empty(
                dataset,
                selection,
                MapOutput::Placeholder {
                    message: err.to_string(),
                },
            )
        }
        Err(err) => {
            warn!("{}: {err}", dataset.id);
            DashboardView::failed(dataset, selection, err.to_string())
        }
    };
    Ok(view)
}

fn assemble(
    config: &DashboardConfig,
    dataset: &DatasetConfig,
    selection: &FilterSelection,
    prepared: &PreparedDataset,
) -> DashboardView {
    let palette = dataset.color_palette();
    let table = &prepared.table;
    let records = prepared.selected();
    if !prepared.filters.is_empty() {
        debug!("Filters kept {} of {} row(s)", records.len(), table.len());
    }

    let outcomes = build_point_outcomes(table, records.iter().copied(), dataset, &palette);
    let excluded_points = outcomes.iter().filter(|o| o.point().is_none()).count();
    if excluded_points > 0 {
        warn!(
            "{}: {excluded_points} row(s) left off the map without valid coordinates",
            dataset.id
        );
    }
    let points = map_points(&outcomes);
    let map = if points.is_empty() {
        MapOutput::Placeholder {
            message: NO_COORDINATES_MESSAGE.to_string(),
        }
    } else {
        MapOutput::Points {
            settings: config.map_settings(dataset).clone(),
            points,
        }
    };

    let stats = summarize(table, records.iter().copied(), &dataset.totals, &palette);
    let layout = ProjectLayout::new(table, dataset);
    let projects = records
        .iter()
        .map(|record| layout.entry(record, &palette, &prepared.filters))
        .collect();
    let table_data = records
        .iter()
        .map(|record| row_object(&table.columns, record))
        .collect();
    info!(
        "{}: {} project(s), {} on the map",
        dataset.id,
        stats.total_projects,
        map.points().len()
    );

    DashboardView {
        id: dataset.id.clone(),
        title: dataset.title.clone(),
        map,
        stats,
        projects,
        columns: table.columns.clone(),
        table_data,
        dam_types: prepared.dam_types.clone(),
        selected: selection.clone(),
        diagnostics: Diagnostics {
            skipped_lines: table.skipped_lines,
            dropped_rows: table.dropped_rows,
            excluded_points,
        },
        error: None,
    }
}

/// Outcomes for the filtered records, for map diagnostics.
pub fn point_outcomes(dataset: &DatasetConfig, prepared: &PreparedDataset) -> Vec<PointOutcome> {
    let palette = dataset.color_palette();
    build_point_outcomes(&prepared.table, prepared.selected(), dataset, &palette)
}

struct ProjectLayout {
    name: Option<usize>,
    amount: Option<usize>,
    hectares: Option<usize>,
    region: Option<usize>,
    kind: Option<usize>,
    districts: Option<usize>,
    purpose: Option<usize>,
    dpr_date: Option<usize>,
    has_length_filter: bool,
}

impl ProjectLayout {
    fn new(table: &CleanedTable, dataset: &DatasetConfig) -> Self {
        let fields = &dataset.fields;
        Self {
            name: table.resolve(&fields.name),
            amount: table.resolve(&fields.amount),
            hectares: table.resolve(&fields.hectares),
            region: table.resolve(&fields.region),
            kind: table.resolve(&fields.kind),
            districts: table.resolve(&fields.districts),
            purpose: table.resolve(&fields.purpose),
            dpr_date: table.resolve(&fields.dpr_date),
            has_length_filter: dataset.filters.is_some(),
        }
    }

    fn entry(
        &self,
        record: &NormalizedRecord,
        palette: &Palette,
        filters: &BoundFilters,
    ) -> ProjectEntry {
        let (lat, lng) = match &record.geo {
            Ok(point) => (Some(point.latitude), Some(point.longitude)),
            Err(_) => (None, None),
        };
        ProjectEntry {
            id: record.position,
            name: display_or_missing(record, self.name),
            status: record.status.clone(),
            color: palette.color_for(&record.status).to_string(),
            amount: display_or_missing(record, self.amount),
            hectares: display_or_missing(record, self.hectares),
            region: display_or_missing(record, self.region),
            kind: display_or_missing(record, self.kind),
            districts: display_or_missing(record, self.districts),
            purpose: display_or_missing(record, self.purpose),
            dpr_date: display_or_missing(record, self.dpr_date),
            lat,
            lng,
            dam_length: self.has_length_filter.then(|| filters.dam_length(record)),
        }
    }
}

fn cell_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Text(text) => Value::String(text.clone()),
        CellValue::Empty => Value::Null,
    }
}

fn row_object(columns: &[String], record: &NormalizedRecord) -> Map<String, Value> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.clone(), cell_json(record.cell(idx))))
        .collect()
}
