//! Navigation orchestrator: which view is active and how "back" works.
//!
//! ```text
//!   Browsing <----> Searching <----> ViewingHistory
//!      |                |                  |
//!      +-------> ViewingDetail <-----------+
//!                (remembers origin)
//! ```
//!
//! Browsing state lives in the [`HierarchyCursor`] and survives excursions
//! into search, history and detail untouched. The crawl [`TaskBoard`] sits
//! beside all of this and never changes the mode.

use crate::cursor::{BrowseCapability, HierarchyCursor};
use crate::error::{NavError, Resolution};
use crate::gateway::FetchGateway;
use crate::history::SearchHistory;
use crate::models::{
    City, District, Facility, Level, Province, SearchFilters, SearchQuery, TaskFilter,
};
use crate::paginator::PageWindow;
use crate::search::{SearchResponse, SearchSession, SearchTicket};
use crate::settings::SettingsStore;
use crate::store::KeyValueStore;
use crate::tasks::TaskBoard;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A list view the history overlay can sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Browsing,
    Searching,
}

/// Where a detail view was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Browsing,
    Searching,
    ViewingHistory { over: Surface },
}

/// The single active view.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationMode {
    Browsing,
    Searching,
    ViewingHistory { over: Surface },
    ViewingDetail { origin: Origin, facility: Box<Facility> },
}

impl NavigationMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Browsing => "browsing",
            Self::Searching => "searching",
            Self::ViewingHistory { .. } => "viewing history",
            Self::ViewingDetail { .. } => "viewing detail",
        }
    }
}

impl From<Surface> for NavigationMode {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::Browsing => Self::Browsing,
            Surface::Searching => Self::Searching,
        }
    }
}

impl From<Origin> for NavigationMode {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Browsing => Self::Browsing,
            Origin::Searching => Self::Searching,
            Origin::ViewingHistory { over } => Self::ViewingHistory { over },
        }
    }
}

/// Top-level controller tying the cursor, search session and history together.
pub struct Navigator {
    gateway: Arc<dyn FetchGateway>,
    cursor: HierarchyCursor,
    search: SearchSession,
    history: SearchHistory,
    settings: SettingsStore,
    tasks: TaskBoard,
    mode: NavigationMode,
}

impl Navigator {
    /// Create a navigator, reading history and settings from `store`.
    pub fn mount(gateway: Arc<dyn FetchGateway>, store: Arc<dyn KeyValueStore>) -> Self {
        let history = SearchHistory::load(store.clone());
        let settings = SettingsStore::load(store);
        let page_size = NonZeroUsize::new(settings.results_per_page()).unwrap_or(NonZeroUsize::MIN);
        tracing::info!(
            "Navigator mounted ({} history entries, {} results per page)",
            history.len(),
            page_size
        );
        Self {
            gateway,
            cursor: HierarchyCursor::new(),
            search: SearchSession::new(page_size),
            history,
            settings,
            tasks: TaskBoard::new(),
            mode: NavigationMode::Browsing,
        }
    }

    /// Fetch the province list.
    pub async fn start(&mut self) -> Resolution {
        self.cursor.load_provinces(self.gateway.as_ref()).await
    }

    pub fn mode(&self) -> &NavigationMode {
        &self.mode
    }

    pub fn cursor(&self) -> &HierarchyCursor {
        &self.cursor
    }

    pub fn search(&self) -> &SearchSession {
        &self.search
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn tasks(&self) -> &TaskBoard {
        &self.tasks
    }

    /// Facility shown in the detail view, if any.
    pub fn detail(&self) -> Option<&Facility> {
        match &self.mode {
            NavigationMode::ViewingDetail { facility, .. } => Some(facility),
            _ => None,
        }
    }

    fn browse(&mut self) -> &mut dyn BrowseCapability {
        &mut self.cursor
    }

    fn require_browsing(&self, action: &'static str) -> Result<(), NavError> {
        match self.mode {
            NavigationMode::Browsing => Ok(()),
            _ => Err(NavError::InvalidTransition {
                from: self.mode.name(),
                action,
            }),
        }
    }

    // Browsing

    pub async fn descend_to_city(&mut self, province: Province) -> Result<Resolution, NavError> {
        self.require_browsing("open a province")?;
        self.cursor
            .descend_to_city(self.gateway.as_ref(), province)
            .await
    }

    pub async fn descend_to_district(&mut self, city: City) -> Result<Resolution, NavError> {
        self.require_browsing("open a city")?;
        self.cursor
            .descend_to_district(self.gateway.as_ref(), city)
            .await
    }

    pub async fn descend_to_facilities(
        &mut self,
        district: District,
    ) -> Result<Resolution, NavError> {
        self.require_browsing("open a district")?;
        self.cursor
            .descend_to_facilities(self.gateway.as_ref(), district)
            .await
    }

    /// Breadcrumb click.
    pub fn ascend_to(&mut self, level: Level) -> Result<(), NavError> {
        self.require_browsing("follow the breadcrumb")?;
        self.cursor.ascend_to(level)
    }

    /// Switch the visible list tab without changing the selection.
    pub fn show_level(&mut self, level: Level) -> Result<(), NavError> {
        self.require_browsing("switch lists")?;
        self.cursor.show_level(level)
    }

    pub fn set_facility_filter(&mut self, filter: impl Into<String>) {
        self.cursor.set_facility_filter(filter);
    }

    pub async fn refresh_current_level_list(&mut self) -> Result<Resolution, NavError> {
        self.require_browsing("refresh the list")?;
        self.cursor
            .refresh_current_level_list(self.gateway.as_ref())
            .await
    }

    /// Remove a facility from the directory and reload the facility list.
    ///
    /// Allowed while browsing, or from the detail view of that facility.
    pub async fn delete_facility(&mut self, id: i64) -> Result<Resolution, NavError> {
        let showing = self.detail().map(|f| f.id);
        match (&self.mode, showing) {
            (NavigationMode::Browsing, _) => {}
            (NavigationMode::ViewingDetail { .. }, Some(shown)) if shown == id => {}
            _ => {
                return Err(NavError::InvalidTransition {
                    from: self.mode.name(),
                    action: "delete a facility",
                })
            }
        }

        self.gateway.delete_facility(id).await?;
        tracing::info!("Deleted facility {}", id);

        if showing == Some(id) {
            self.return_from_detail()?;
        }
        if self.mode == NavigationMode::Browsing && self.cursor.selection().district.is_some() {
            return self.refresh_current_level_list().await;
        }
        Ok(Resolution::Applied)
    }

    // Detail

    /// Open the detail view for a facility in the list currently on screen.
    pub fn select_facility(&mut self, id: i64) -> Result<&Facility, NavError> {
        let origin = match self.mode {
            NavigationMode::Browsing => Origin::Browsing,
            NavigationMode::Searching => Origin::Searching,
            NavigationMode::ViewingHistory { over } => Origin::ViewingHistory { over },
            NavigationMode::ViewingDetail { .. } => {
                return Err(NavError::InvalidTransition {
                    from: self.mode.name(),
                    action: "open another detail view",
                })
            }
        };
        let source = match origin {
            Origin::Browsing | Origin::ViewingHistory { over: Surface::Browsing } => {
                Surface::Browsing
            }
            Origin::Searching | Origin::ViewingHistory { over: Surface::Searching } => {
                Surface::Searching
            }
        };

        let facility = match source {
            Surface::Browsing => self.browse().lookup_cached_facility(id)?.clone(),
            Surface::Searching => self
                .search
                .results()
                .and_then(|results| results.find(id))
                .cloned()
                .ok_or(NavError::NotFound { id })?,
        };

        tracing::debug!("Opening facility {} from {:?}", id, origin);
        self.mode = NavigationMode::ViewingDetail {
            origin,
            facility: Box::new(facility),
        };
        self.detail().ok_or(NavError::NotFound { id })
    }

    /// Leave the detail view for the view it was opened from.
    pub fn return_from_detail(&mut self) -> Result<(), NavError> {
        let NavigationMode::ViewingDetail { origin, .. } = self.mode else {
            return Err(NavError::InvalidTransition {
                from: self.mode.name(),
                action: "leave the detail view",
            });
        };
        self.mode = origin.into();
        if matches!(
            origin,
            Origin::Browsing | Origin::ViewingHistory { over: Surface::Browsing }
        ) {
            let level = self.browse().resume_last_list();
            tracing::debug!("Resumed browsing at {}", level);
        }
        Ok(())
    }

    // Search

    /// Switch to the search view and start a search. Blank text is not recorded.
    pub fn begin_search(&mut self, query: SearchQuery) -> SearchTicket {
        if let Err(e) = self.history.record(&query.text) {
            tracing::warn!("Failed to save search history: {}", e);
        }
        self.mode = NavigationMode::Searching;
        self.search.begin(query)
    }

    pub fn finish_search(&mut self, response: SearchResponse) -> Resolution {
        self.search.apply(response)
    }

    /// User-initiated search from any view.
    pub async fn enter_search(&mut self, query: SearchQuery) -> Resolution {
        let ticket = self.begin_search(query);
        let response = ticket.fetch(self.gateway.as_ref()).await;
        self.finish_search(response)
    }

    /// Re-run the current search text with different filters.
    pub async fn refine_search(&mut self, filters: SearchFilters) -> Result<Resolution, NavError> {
        if self.mode != NavigationMode::Searching {
            return Err(NavError::InvalidTransition {
                from: self.mode.name(),
                action: "change search filters",
            });
        }
        let query = SearchQuery {
            text: self.search.query().text.clone(),
            filters,
        };
        Ok(self.search.run(self.gateway.as_ref(), query).await)
    }

    /// Drop the search and go back to where browsing left off.
    pub fn exit_search(&mut self) -> Result<(), NavError> {
        match self.mode {
            NavigationMode::Browsing => return Ok(()),
            NavigationMode::ViewingDetail { .. } => {
                return Err(NavError::InvalidTransition {
                    from: self.mode.name(),
                    action: "leave search",
                })
            }
            NavigationMode::Searching | NavigationMode::ViewingHistory { .. } => {}
        }
        self.search.clear();
        self.mode = NavigationMode::Browsing;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) -> PageWindow {
        self.search.set_page(page)
    }

    /// Change the search page size and persist it. Returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), NavError> {
        self.search.set_page_size(page_size)?;
        if let Err(e) = self.settings.set_results_per_page(page_size) {
            tracing::warn!("Failed to save page size: {}", e);
        }
        Ok(())
    }

    // History

    pub fn show_history(&mut self) -> Result<(), NavError> {
        let over = match self.mode {
            NavigationMode::Browsing => Surface::Browsing,
            NavigationMode::Searching => Surface::Searching,
            NavigationMode::ViewingHistory { .. } => return Ok(()),
            NavigationMode::ViewingDetail { .. } => {
                return Err(NavError::InvalidTransition {
                    from: self.mode.name(),
                    action: "show search history",
                })
            }
        };
        self.mode = NavigationMode::ViewingHistory { over };
        Ok(())
    }

    pub fn close_history(&mut self) -> Result<(), NavError> {
        let NavigationMode::ViewingHistory { over } = self.mode else {
            return Err(NavError::InvalidTransition {
                from: self.mode.name(),
                action: "close search history",
            });
        };
        self.mode = over.into();
        Ok(())
    }

    /// Re-run the history entry at `index` with no filters.
    pub async fn select_history(&mut self, index: usize) -> Result<Resolution, NavError> {
        if !matches!(self.mode, NavigationMode::ViewingHistory { .. }) {
            return Err(NavError::InvalidTransition {
                from: self.mode.name(),
                action: "pick a history entry",
            });
        }
        let text = self
            .history
            .get(index)
            .map(String::from)
            .ok_or_else(|| NavError::Validation(format!("no history entry #{}", index + 1)))?;
        Ok(self.enter_search(SearchQuery::text(text)).await)
    }

    pub fn clear_history(&mut self) {
        if let Err(e) = self.history.clear() {
            tracing::warn!("Failed to save search history: {}", e);
        }
    }

    // Settings

    /// Restore default settings, including the search page size.
    pub fn reset_settings(&mut self) {
        if let Err(e) = self.settings.reset() {
            tracing::warn!("Failed to save settings: {}", e);
        }
        let page_size = self.settings.results_per_page();
        if let Err(e) = self.search.set_page_size(page_size) {
            tracing::warn!("Default page size rejected: {}", e);
        }
    }

    // Tasks

    pub async fn refresh_tasks(&mut self) -> Resolution {
        self.tasks.refresh(self.gateway.as_ref()).await
    }

    /// Switch the task tab and load it.
    pub async fn show_tasks(&mut self, filter: TaskFilter) -> Resolution {
        self.tasks.set_filter(filter);
        self.refresh_tasks().await
    }

    pub async fn start_nationwide_scan(&mut self) -> Result<String, NavError> {
        self.tasks.start_nationwide_scan(self.gateway.as_ref()).await
    }
}
