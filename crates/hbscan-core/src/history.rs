//! Search history: recent query strings, most recent first.

use crate::error::StoreError;
use crate::store::{load_json, save_json, KeyValueStore};
use std::sync::Arc;

/// Storage key for the history list.
pub const HISTORY_KEY: &str = "hbscan_search_history";

/// Maximum number of remembered queries.
pub const MAX_HISTORY: usize = 5;

/// Bounded, deduplicated list of past queries backed by a key-value store.
pub struct SearchHistory {
    entries: Vec<String>,
    store: Arc<dyn KeyValueStore>,
}

impl SearchHistory {
    /// Load history from the store. Unreadable data starts an empty history.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match load_json::<Vec<String>>(store.as_ref(), HISTORY_KEY) {
            Ok(Some(entries)) => normalize(entries),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Discarding unreadable search history: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Loaded {} search history entries", entries.len());
        Self { entries, store }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Put `query` at the front. Blank queries are ignored.
    ///
    /// Returns whether the history changed.
    pub fn record(&mut self, query: &str) -> Result<bool, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(false);
        }
        if self.entries.first().map(String::as_str) == Some(query) {
            return Ok(false);
        }

        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_HISTORY);
        self.save()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), HISTORY_KEY, &self.entries)
    }
}

/// Trim, dedupe and cap a stored list.
fn normalize(raw: Vec<String>) -> Vec<String> {
    let mut entries: Vec<String> = Vec::with_capacity(MAX_HISTORY);
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() || entries.iter().any(|e| e == entry) {
            continue;
        }
        entries.push(entry.to_string());
        if entries.len() == MAX_HISTORY {
            break;
        }
    }
    entries
}
