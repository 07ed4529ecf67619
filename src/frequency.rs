use std::{collections::HashMap, hash::Hash};

use itertools::Itertools;

use crate::loader::Table;

/// Counts occurrences of keys, rendering them most-frequent first.
#[derive(Debug, Clone)]
pub struct FrequencyAccumulator<K> {
    counts: HashMap<K, usize>,
    total: usize,
}

impl<K> Default for FrequencyAccumulator<K> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            total: 0,
        }
    }
}

impl<K> FrequencyAccumulator<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, key: K) {
        self.total += 1;
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, key: &K) -> usize {
        self.counts.get(key).copied().unwrap_or_default()
    }

    /// Entries ordered by descending count, ties broken by key.
    pub fn sorted(&self) -> Vec<(K, usize)> {
        let mut items = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect::<Vec<_>>();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        items
    }

    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (count as f64 / self.total as f64) * 100.0
        }
    }
}

/// Sorted distinct non-missing display values of `column`.
pub fn distinct_values(table: &Table, column: usize) -> Vec<String> {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|cell| !cell.is_missing())
        .map(|cell| cell.as_display())
        .sorted()
        .dedup()
        .collect()
}
