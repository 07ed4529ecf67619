//! Summary statistics over cleaned records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    clean::{CleanedTable, CoercedSum, NormalizedRecord, cell_sum},
    config::{ColumnMatcher, TotalsConfig},
    data::format_number,
    frequency::FrequencyAccumulator,
    status::{Palette, ProjectStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub total_projects: usize,
    pub total_amount: f64,
    pub total_area: f64,
    pub completed_projects: usize,
    pub status_breakdown: Vec<StatusCount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_totals: BTreeMap<String, f64>,
}

impl StatisticsSummary {
    pub fn count_for(&self, status: &ProjectStatus) -> usize {
        self.status_breakdown
            .iter()
            .find(|entry| &entry.status == status)
            .map(|entry| entry.count)
            .unwrap_or_default()
    }

    /// Two-column `metric | value` rows for terminal output.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["total_projects".to_string(), self.total_projects.to_string()],
            vec!["total_amount".to_string(), format_number(self.total_amount)],
            vec!["total_area".to_string(), format_number(self.total_area)],
            vec![
                "completed_projects".to_string(),
                self.completed_projects.to_string(),
            ],
        ];
        for (label, value) in &self.extra_totals {
            rows.push(vec![label.clone(), format_number(*value)]);
        }
        for entry in &self.status_breakdown {
            rows.push(vec![format!("status: {}", entry.status), entry.count.to_string()]);
        }
        rows
    }
}

/// Running sum of one resolved column.
#[derive(Debug, Clone)]
struct ColumnTotal {
    column: Option<usize>,
    sum: CoercedSum,
}

impl ColumnTotal {
    fn resolve(table: &CleanedTable, matchers: &[ColumnMatcher]) -> Self {
        Self {
            column: table.resolve(matchers),
            sum: CoercedSum::ZERO,
        }
    }

    fn add(&mut self, record: &NormalizedRecord) {
        if let Some(column) = self.column {
            self.sum = self.sum + cell_sum(record.cell(column));
        }
    }

    fn value(&self) -> f64 {
        self.sum.rounded()
    }
}

struct StatsAccumulator {
    amount: ColumnTotal,
    area: ColumnTotal,
    extra: Vec<(String, ColumnTotal)>,
    statuses: FrequencyAccumulator<ProjectStatus>,
}

impl StatsAccumulator {
    fn new(table: &CleanedTable, totals: &TotalsConfig) -> Self {
        Self {
            amount: ColumnTotal::resolve(table, &totals.amount),
            area: ColumnTotal::resolve(table, &totals.area),
            extra: totals
                .extra
                .iter()
                .map(|extra| (extra.label.clone(), ColumnTotal::resolve(table, &extra.columns)))
                .collect(),
            statuses: FrequencyAccumulator::new(),
        }
    }

    fn ingest(&mut self, record: &NormalizedRecord) {
        self.amount.add(record);
        self.area.add(record);
        for (_, total) in &mut self.extra {
            total.add(record);
        }
        self.statuses.ingest(record.status.clone());
    }

    fn finish(self, palette: &Palette) -> StatisticsSummary {
        let status_breakdown = self
            .statuses
            .sorted()
            .into_iter()
            .map(|(status, count)| StatusCount {
                color: palette.color_for(&status).to_string(),
                status,
                count,
            })
            .collect();
        StatisticsSummary {
            total_projects: self.statuses.total(),
            total_amount: self.amount.value(),
            total_area: self.area.value(),
            completed_projects: self.statuses.count(&ProjectStatus::Completed),
            status_breakdown,
            extra_totals: self
                .extra
                .iter()
                .map(|(label, total)| (label.clone(), total.value()))
                .collect(),
        }
    }
}

/// Aggregates `records`, which must belong to `table`.
///
/// Columns are resolved against the table, so an empty record set still
/// reports every configured extra total, as zero.
pub fn summarize<'a, I>(
    table: &CleanedTable,
    records: I,
    totals: &TotalsConfig,
    palette: &Palette,
) -> StatisticsSummary
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut stats = StatsAccumulator::new(table, totals);
    for record in records {
        stats.ingest(record);
    }
    stats.finish(palette)
}

pub fn summarize_table(
    table: &CleanedTable,
    totals: &TotalsConfig,
    palette: &Palette,
) -> StatisticsSummary {
    summarize(table, &table.records, totals, palette)
}
