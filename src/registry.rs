// Registry of monthly datasets keyed by period.
//
// Inserts are whole-dataset replacements. Each insertion is stamped with a
// fresh generation number, which is the dataset's identity and the
// tie-breaker when two periods share a date. The latest generation handed
// out is the registry's revision: any insert anywhere changes it.
use crate::types::{Dataset, Source};
use std::collections::HashMap;

#[derive(Debug)]
struct Slot {
    dataset: Dataset,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: HashMap<String, Slot>,
    next_generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the dataset stored under `period`.
    pub fn put(&mut self, period: &str, mut dataset: Dataset) {
        dataset.period = period.to_string();
        self.next_generation += 1;
        let generation = self.next_generation;
        if let Some(old) = self.slots.insert(
            period.to_string(),
            Slot {
                dataset,
                generation,
            },
        ) {
            log::info!(
                "replaced {} ({}, {} records)",
                period,
                old.dataset.source.label(),
                old.dataset.len()
            );
        }
    }

    /// Insert unless a higher-priority source already holds the period.
    ///
    /// Uploaded and remote data beat local files; a local rescan leaves them
    /// alone, and nothing here touches other periods. Returns whether the
    /// dataset was stored.
    pub fn offer(&mut self, dataset: Dataset) -> bool {
        if let Some(existing) = self.slots.get(&dataset.period) {
            if existing.dataset.source.priority() > dataset.source.priority() {
                log::info!(
                    "kept {} from {} over {}",
                    dataset.period,
                    existing.dataset.source.label(),
                    dataset.source.label()
                );
                return false;
            }
        }
        let period = dataset.period.clone();
        self.put(&period, dataset);
        true
    }

    pub fn get(&self, period: &str) -> Option<&Dataset> {
        self.slots.get(period).map(|s| &s.dataset)
    }

    pub fn generation(&self, period: &str) -> Option<u64> {
        self.slots.get(period).map(|s| s.generation)
    }

    /// Changes on every insert or replacement, whatever the period.
    pub fn revision(&self) -> u64 {
        self.next_generation
    }

    pub fn contains(&self, period: &str) -> bool {
        self.slots.contains_key(period)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Period keys, most recent date first; equal dates keep insertion order.
    pub fn list_periods(&self) -> Vec<String> {
        let mut slots: Vec<(&String, &Slot)> = self.slots.iter().collect();
        slots.sort_by_key(|(_, s)| s.generation);
        slots.sort_by(|a, b| b.1.dataset.date.cmp(&a.1.dataset.date));
        slots.into_iter().map(|(k, _)| k.clone()).collect()
    }

    /// The chronologically prior period, if any.
    pub fn previous(&self, period: &str) -> Option<String> {
        let periods = self.list_periods();
        let idx = periods.iter().position(|p| p == period)?;
        periods.get(idx + 1).cloned()
    }

    /// Datasets in `list_periods` order.
    pub fn datasets(&self) -> Vec<&Dataset> {
        self.list_periods()
            .iter()
            .filter_map(|p| self.get(p))
            .collect()
    }

    /// (local, uploaded or remote) period counts.
    pub fn counts_by_source(&self) -> (usize, usize) {
        self.slots
            .values()
            .fold((0, 0), |(local, other), s| match s.dataset.source {
                Source::Local => (local + 1, other),
                Source::Uploaded | Source::Remote => (local, other + 1),
            })
    }
}
