use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("results table already has an entry for {key}")]
pub struct DuplicateKey {
    pub key: String,
}

/// Display name → average insertions, for completed repositories only.
///
/// Owned by a single aggregator; each key is written at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    entries: BTreeMap<String, f64>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, average: f64) -> Result<(), DuplicateKey> {
        if self.entries.contains_key(key) {
            return Err(DuplicateKey {
                key: key.to_string(),
            });
        }
        self.entries.insert(key.to_string(), average);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Entries sorted by display name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
