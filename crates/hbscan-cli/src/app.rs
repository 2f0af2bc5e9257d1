//! Application state management.

use hbscan_core::{
    Level, NavError, NavigationMode, Navigator, Resolution, SearchFilters, SearchQuery,
    TaskFilter,
};
use std::time::{Duration, Instant};

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    /// Application should quit.
    Quit,
}

/// Top-level tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Directory,
    Tasks,
}

/// What a numbered item on screen refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    Browse(Level),
    Results,
    History,
    Detail,
    Tasks,
}

/// Main application model.
pub struct App {
    /// Current application state.
    pub state: AppState,
    /// Navigation and search state.
    pub navigator: Navigator,
    /// One-off message shown until the next command.
    pub message: Option<String>,
    /// Whether the command overlay is shown.
    pub show_help: bool,
    pub tab: Tab,
    /// Command line being typed.
    pub command_input: String,
    /// Highlighted row of the list on screen.
    pub selected_index: usize,
    last_task_refresh: Option<Instant>,
}

/// Item `n` (1-based) of a listing.
fn nth<T>(items: &[T], n: usize) -> Result<&T, NavError> {
    n.checked_sub(1)
        .and_then(|index| items.get(index))
        .ok_or_else(|| NavError::Validation(format!("no item #{} in this list", n)))
}

impl App {
    /// Create a new application instance.
    pub fn new(navigator: Navigator) -> Self {
        Self {
            state: AppState::Running,
            navigator,
            message: None,
            show_help: false,
            tab: Tab::Directory,
            command_input: String::new(),
            selected_index: 0,
            last_task_refresh: None,
        }
    }

    /// Load the province list.
    pub async fn start(&mut self) {
        self.navigator.start().await;
    }

    fn listing(&self) -> Listing {
        if self.tab == Tab::Tasks {
            return Listing::Tasks;
        }
        match self.navigator.mode() {
            NavigationMode::Browsing => Listing::Browse(self.navigator.cursor().active_level()),
            NavigationMode::Searching => Listing::Results,
            NavigationMode::ViewingHistory { .. } => Listing::History,
            NavigationMode::ViewingDetail { .. } => Listing::Detail,
        }
    }

    /// Number of selectable rows on screen.
    pub fn item_count(&self) -> usize {
        let cursor = self.navigator.cursor();
        match self.listing() {
            Listing::Browse(Level::Provinces) => cursor.provinces().len(),
            Listing::Browse(Level::Cities) => cursor.cities().len(),
            Listing::Browse(Level::Districts) => cursor.districts().len(),
            Listing::Browse(Level::Facilities) => cursor.visible_facilities().len(),
            Listing::Results => self.navigator.search().current_page_items().len(),
            Listing::History => self.navigator.history().len(),
            Listing::Tasks => self.navigator.tasks().visible_tasks().len(),
            Listing::Detail => 0,
        }
    }

    pub fn move_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected_index + 1 < self.item_count() {
            self.selected_index += 1;
        }
    }

    /// Record the outcome of a command for the next render.
    pub fn report(&mut self, result: Result<Resolution, NavError>) {
        match result {
            Ok(Resolution::Applied) => {}
            Ok(Resolution::Failed) => {
                // The views show the retained error themselves.
                tracing::debug!("Command finished with a fetch failure");
            }
            Ok(Resolution::Superseded) => {
                self.message = Some("A newer request replaced this one".to_string());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Open the highlighted row.
    pub async fn select_current_item(&mut self) -> Result<Resolution, NavError> {
        match self.listing() {
            Listing::Detail | Listing::Tasks => Ok(Resolution::Applied),
            _ => self.enter(self.selected_index + 1).await,
        }
    }

    /// Open item `n` of the list on screen.
    pub async fn enter(&mut self, n: usize) -> Result<Resolution, NavError> {
        let result = match self.listing() {
            Listing::Browse(Level::Provinces) => {
                let province = nth(self.navigator.cursor().provinces(), n)?.clone();
                self.navigator.descend_to_city(province).await
            }
            Listing::Browse(Level::Cities) => {
                let city = nth(self.navigator.cursor().cities(), n)?.clone();
                self.navigator.descend_to_district(city).await
            }
            Listing::Browse(Level::Districts) => {
                let district = nth(self.navigator.cursor().districts(), n)?.clone();
                self.navigator.descend_to_facilities(district).await
            }
            Listing::Browse(Level::Facilities) => {
                let id = nth(&self.navigator.cursor().visible_facilities(), n)?.id;
                self.open(id)
            }
            Listing::Results => {
                let id = nth(self.navigator.search().current_page_items(), n)?.id;
                self.open(id)
            }
            Listing::History => self.pick_history(n).await,
            Listing::Detail => Err(NavError::InvalidTransition {
                from: "viewing detail",
                action: "open a list item",
            }),
            Listing::Tasks => Err(NavError::InvalidTransition {
                from: "viewing tasks",
                action: "open a list item",
            }),
        };
        self.selected_index = 0;
        result
    }

    /// Open the detail view for facility `id`.
    pub fn open(&mut self, id: i64) -> Result<Resolution, NavError> {
        self.navigator.select_facility(id)?;
        Ok(Resolution::Applied)
    }

    /// Follow breadcrumb entry `n` (1-based, 1 is the national root).
    pub fn up(&mut self, n: usize) -> Result<Resolution, NavError> {
        let trail = self.navigator.cursor().breadcrumb();
        let crumb = nth(&trail, n)?;
        let level = crumb.target.ok_or_else(|| {
            NavError::Validation(format!("already inside {}", crumb.label))
        })?;
        self.navigator.ascend_to(level)?;
        self.selected_index = 0;
        Ok(Resolution::Applied)
    }

    /// Step back one view: detail, history, search, then up the hierarchy.
    pub fn back(&mut self) -> Result<Resolution, NavError> {
        match self.listing() {
            Listing::Tasks => self.tab = Tab::Directory,
            Listing::Detail => self.navigator.return_from_detail()?,
            Listing::History => self.navigator.close_history()?,
            Listing::Results => self.navigator.exit_search()?,
            Listing::Browse(Level::Provinces) => {
                return Err(NavError::Validation("already at the top".to_string()))
            }
            Listing::Browse(Level::Cities) => self.navigator.ascend_to(Level::Provinces)?,
            Listing::Browse(Level::Districts) => self.navigator.ascend_to(Level::Cities)?,
            Listing::Browse(Level::Facilities) => self.navigator.ascend_to(Level::Districts)?,
        }
        self.selected_index = 0;
        Ok(Resolution::Applied)
    }

    pub async fn search(&mut self, query: SearchQuery) -> Result<Resolution, NavError> {
        Ok(self.navigator.enter_search(query).await)
    }

    pub async fn refine(&mut self, filters: SearchFilters) -> Result<Resolution, NavError> {
        self.navigator.refine_search(filters).await
    }

    /// Run history entry `n` (1-based), opening the history view first if needed.
    pub async fn pick_history(&mut self, n: usize) -> Result<Resolution, NavError> {
        if n == 0 || n > self.navigator.history().len() {
            return Err(NavError::Validation(format!("no history entry #{}", n)));
        }
        if self.listing() != Listing::History {
            self.navigator.show_history()?;
        }
        self.navigator.select_history(n - 1).await
    }

    /// Jump to a search results page typed by the user.
    pub fn jump_to_page(&mut self, input: &str) -> Result<Resolution, NavError> {
        if self.listing() != Listing::Results {
            return Err(NavError::InvalidTransition {
                from: self.navigator.mode().name(),
                action: "change page",
            });
        }
        let window = self.navigator.search().page_window();
        let page = match input {
            "next" | "n" => window.current_page + 1,
            "prev" | "p" => window.current_page.saturating_sub(1),
            _ => hbscan_core::paginator::parse_page_input(input, window.total_pages).ok_or_else(
                || NavError::Validation(format!("pages run from 1 to {}", window.total_pages)),
            )?,
        };
        self.navigator.set_page(page);
        self.selected_index = 0;
        Ok(Resolution::Applied)
    }

    // Tasks

    /// Switch to the task tab showing `filter` and load it.
    pub async fn show_tasks(&mut self, filter: TaskFilter) -> Result<Resolution, NavError> {
        self.tab = Tab::Tasks;
        self.selected_index = 0;
        self.last_task_refresh = Some(Instant::now());
        Ok(self.navigator.show_tasks(filter).await)
    }

    pub async fn refresh_tasks(&mut self) -> Resolution {
        self.last_task_refresh = Some(Instant::now());
        self.navigator.refresh_tasks().await
    }

    /// Whether the task tab is open and older than `interval`.
    pub fn tasks_due(&self, interval: Duration) -> bool {
        self.tab == Tab::Tasks
            && self
                .last_task_refresh
                .map_or(true, |at| at.elapsed() >= interval)
    }

    pub async fn start_scan(&mut self) -> Result<Resolution, NavError> {
        let task_id = self.navigator.start_nationwide_scan().await?;
        self.tab = Tab::Tasks;
        self.selected_index = 0;
        self.message = Some(format!("Started nationwide scan {}", task_id));
        Ok(Resolution::Applied)
    }

    pub async fn toggle_tab(&mut self) {
        match self.tab {
            Tab::Directory => {
                let filter = self.navigator.tasks().filter();
                let result = self.show_tasks(filter).await;
                self.report(result);
            }
            Tab::Tasks => {
                self.tab = Tab::Directory;
                self.selected_index = 0;
            }
        }
    }

    /// Show the stored settings in the message line.
    pub fn describe_settings(&mut self) {
        let settings = self.navigator.settings().get();
        self.message = Some(format!(
            "{} results per page, crawl depth {}, crawl pages {}, keywords: {}",
            settings.procurement_results_per_page,
            settings.crawler_max_depth,
            settings.crawler_max_pages,
            settings.procurement_keywords.join(" ")
        ));
    }
}
