// Memoization for report tables.
//
// Entries are keyed by (period, registry revision, parameters). A month
// report also reads neighbouring months (previous-month deltas, the trend),
// so any insert into the registry retires every entry, not only those of
// the replaced period. `prune` drops retired entries.
use crate::error::{ReportError, ReportResult};
use crate::registry::Registry;
use crate::types::Dataset;
use std::collections::HashMap;

type Key = (String, u64, String);

#[derive(Debug)]
pub struct Memo<V> {
    entries: HashMap<Key, V>,
    hits: usize,
    misses: usize,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V: Clone> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result of `compute` over the current dataset for `period`.
    ///
    /// `compute` may read any dataset in `registry`.
    pub fn get_or_compute<F>(
        &mut self,
        registry: &Registry,
        period: &str,
        params: &str,
        compute: F,
    ) -> ReportResult<V>
    where
        F: FnOnce(&Dataset) -> ReportResult<V>,
    {
        let Some(ds) = registry.get(period) else {
            return Err(ReportError::UnknownPeriod(period.to_string()));
        };
        let key = (period.to_string(), registry.revision(), params.to_string());
        if let Some(v) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(v.clone());
        }
        self.misses += 1;
        let v = compute(ds)?;
        self.entries.insert(key, v.clone());
        Ok(v)
    }

    /// Drop entries computed before the registry last changed.
    pub fn prune(&mut self, registry: &Registry) {
        let revision = registry.revision();
        self.entries
            .retain(|(period, rev, _), _| *rev == revision && registry.contains(period));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
