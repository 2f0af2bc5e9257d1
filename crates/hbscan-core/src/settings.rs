//! Global display settings persisted across sessions.

use crate::error::{NavError, StoreError};
use crate::store::{load_json, save_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage key for the settings blob.
pub const SETTINGS_KEY: &str = "hbscan_global_settings";

/// Settings shared by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub crawler_max_depth: u32,
    pub crawler_max_pages: u32,
    /// Page size of the search results view.
    pub procurement_results_per_page: usize,
    pub procurement_keywords: Vec<String>,
}

fn default_crawler_max_depth() -> u32 {
    10
}

fn default_crawler_max_pages() -> u32 {
    150
}

fn default_results_per_page() -> usize {
    20
}

fn default_procurement_keywords() -> Vec<String> {
    ["公告", "采购", "公开", "招标", "询价"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            crawler_max_depth: default_crawler_max_depth(),
            crawler_max_pages: default_crawler_max_pages(),
            procurement_results_per_page: default_results_per_page(),
            procurement_keywords: default_procurement_keywords(),
        }
    }
}

/// Stored form: every field optional so older or partial blobs still load.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings {
    crawler_max_depth: Option<u32>,
    crawler_max_pages: Option<u32>,
    procurement_results_per_page: Option<usize>,
    procurement_keywords: Option<Vec<String>>,
}

impl From<StoredSettings> for GlobalSettings {
    fn from(stored: StoredSettings) -> Self {
        // Zero means "unset" for the numeric fields.
        Self {
            crawler_max_depth: stored
                .crawler_max_depth
                .filter(|v| *v > 0)
                .unwrap_or_else(default_crawler_max_depth),
            crawler_max_pages: stored
                .crawler_max_pages
                .filter(|v| *v > 0)
                .unwrap_or_else(default_crawler_max_pages),
            procurement_results_per_page: stored
                .procurement_results_per_page
                .filter(|v| *v > 0)
                .unwrap_or_else(default_results_per_page),
            procurement_keywords: stored
                .procurement_keywords
                .unwrap_or_else(default_procurement_keywords),
        }
    }
}

/// Settings plus the store they are written back to after every change.
pub struct SettingsStore {
    settings: GlobalSettings,
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match load_json::<StoredSettings>(store.as_ref(), SETTINGS_KEY) {
            Ok(Some(stored)) => stored.into(),
            Ok(None) => GlobalSettings::default(),
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                GlobalSettings::default()
            }
        };
        tracing::debug!("Loaded settings: {:?}", settings);
        Self { settings, store }
    }

    pub fn get(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn results_per_page(&self) -> usize {
        self.settings.procurement_results_per_page
    }

    /// Change the search results page size.
    pub fn set_results_per_page(&mut self, page_size: usize) -> Result<(), NavError> {
        if page_size == 0 {
            return Err(NavError::Validation(
                "page size must be at least 1".to_string(),
            ));
        }
        self.update(|s| s.procurement_results_per_page = page_size)?;
        Ok(())
    }

    /// Apply an arbitrary change and persist it.
    pub fn update(&mut self, change: impl FnOnce(&mut GlobalSettings)) -> Result<(), StoreError> {
        change(&mut self.settings);
        self.save()
    }

    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.settings = GlobalSettings::default();
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), SETTINGS_KEY, &self.settings)
    }
}
