//! Core navigation and search state for hbscan.
//!
//! This crate holds everything between the remote directory service and a
//! frontend: the hierarchy drill-down cursor, the search session, result
//! pagination, search history, the crawl task board and the controller that decides which of
//! them is on screen.

pub mod cursor;
pub mod error;
pub mod gateway;
pub mod history;
pub mod models;
pub mod navigator;
pub mod paginator;
pub mod search;
pub mod settings;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use cursor::{BrowseCapability, Crumb, HierarchyCursor, Selection};
pub use error::{FetchError, NavError, Resolution, StoreError};
pub use gateway::{FetchGateway, HttpGateway};
pub use history::SearchHistory;
pub use models::{
    City, District, Facility, Level, LinkStatus, ProcurementStatus, Province, SearchFilters,
    SearchQuery, SearchResultSet, Task, TaskFilter, TaskKind, TaskStatus,
};
pub use navigator::{NavigationMode, Navigator, Origin, Surface};
pub use paginator::{PageItem, PageWindow};
pub use search::SearchSession;
pub use settings::{GlobalSettings, SettingsStore};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use tasks::TaskBoard;
