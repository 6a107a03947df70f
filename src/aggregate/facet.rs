use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::aggregate::monoid::Monoid;

/// Per-field value counts, each field truncated to its `top_n` most
/// frequent values.
///
/// Every participant truncates before merging, so a value that is frequent
/// overall but never in a shard's local top-N is undercounted or missing.
/// Counts are exact only when no shard truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetTable {
    top_n: usize,
    fields: BTreeMap<String, BTreeMap<String, u64>>,
}

impl FacetTable {
    pub fn new(top_n: usize) -> Self {
        FacetTable { top_n, fields: BTreeMap::new() }
    }

    /// A table for one field, truncated to `top_n`.
    pub fn from_counts<I>(field: impl Into<String>, top_n: usize, counts: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut table = FacetTable::new(top_n);
        let values = table.fields.entry(field.into()).or_default();
        for (value, count) in counts {
            *values.entry(value).or_insert(0) += count;
        }
        table.truncate();
        table
    }

    pub fn with_field<I>(mut self, field: impl Into<String>, counts: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let values = self.fields.entry(field.into()).or_default();
        for (value, count) in counts {
            *values.entry(value).or_insert(0) += count;
        }
        self.truncate();
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn counts(&self, field: &str) -> Option<&BTreeMap<String, u64>> {
        self.fields.get(field)
    }

    pub fn count(&self, field: &str, value: &str) -> u64 {
        self.fields.get(field).and_then(|v| v.get(value)).copied().unwrap_or(0)
    }

    /// Entries of `field`, count descending, value ascending on ties.
    pub fn sorted(&self, field: &str) -> Vec<(String, u64)> {
        self.fields.get(field).map(sorted_counts).unwrap_or_default()
    }

    /// Keep only the `top_n` most frequent values of each field.
    fn truncate(&mut self) {
        let top_n = self.top_n;
        for values in self.fields.values_mut() {
            if values.len() > top_n {
                let kept = sorted_counts(values).into_iter().take(top_n).collect();
                *values = kept;
            }
        }
    }
}

fn sorted_counts(values: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = values.iter().map(|(v, c)| (v.clone(), *c)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

impl Monoid for FacetTable {
    fn identity() -> Self {
        FacetTable::new(0)
    }

    fn combine(mut self, other: Self) -> Self {
        self.top_n = self.top_n.max(other.top_n);
        for (field, values) in other.fields {
            let target = self.fields.entry(field).or_default();
            for (value, count) in values {
                *target.entry(value).or_insert(0) += count;
            }
        }
        self.truncate();
        self
    }
}
