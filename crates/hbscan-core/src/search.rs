//! Search session: query, full result set and the page being viewed.

use crate::error::{FetchError, NavError, Resolution};
use crate::gateway::FetchGateway;
use crate::models::{Facility, SearchQuery, SearchResultSet};
use crate::paginator::PageWindow;
use std::num::NonZeroUsize;

/// Permission to run one search; only the latest ticket's result is applied.
#[derive(Debug)]
#[must_use = "a search does nothing until it is fetched and applied"]
pub struct SearchTicket {
    token: u64,
    query: SearchQuery,
}

/// Result of a ticket's search call.
#[derive(Debug)]
pub struct SearchResponse {
    token: u64,
    query: SearchQuery,
    result: Result<Vec<Facility>, FetchError>,
}

impl SearchTicket {
    pub async fn fetch(self, gateway: &dyn FetchGateway) -> SearchResponse {
        let result = gateway.search(&self.query).await;
        SearchResponse {
            token: self.token,
            query: self.query,
            result,
        }
    }
}

/// State of the search view.
#[derive(Debug)]
pub struct SearchSession {
    query: SearchQuery,
    results: Option<SearchResultSet>,
    current_page: usize,
    page_size: NonZeroUsize,
    last_error: Option<FetchError>,
    issued: u64,
    pending: Option<u64>,
}

impl SearchSession {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            query: SearchQuery::default(),
            results: None,
            current_page: 1,
            page_size,
            last_error: None,
            issued: 0,
            pending: None,
        }
    }

    /// Query of the most recent search call.
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn results(&self) -> Option<&SearchResultSet> {
        self.results.as_ref()
    }

    /// Whether any search has completed since the session was last cleared.
    pub fn has_searched(&self) -> bool {
        self.results.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Error from the last failed search, cleared by the next success.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// Page position over the current result set.
    pub fn page_window(&self) -> PageWindow {
        let total = self.results.as_ref().map_or(0, SearchResultSet::len);
        PageWindow::with_page_size(total, self.page_size, self.current_page)
    }

    /// Facilities on the current page.
    pub fn current_page_items(&self) -> &[Facility] {
        match &self.results {
            Some(results) => self.page_window().slice(&results.facilities),
            None => &[],
        }
    }

    /// Move to `page`, clamped into the valid range.
    pub fn set_page(&mut self, page: usize) -> PageWindow {
        self.current_page = page;
        let window = self.page_window();
        self.current_page = window.current_page;
        window
    }

    /// Change the page size. Always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), NavError> {
        self.page_size = NonZeroUsize::new(page_size)
            .ok_or_else(|| NavError::Validation("page size must be at least 1".to_string()))?;
        self.current_page = 1;
        Ok(())
    }

    /// Start a search. Supersedes any search still in flight.
    pub fn begin(&mut self, query: SearchQuery) -> SearchTicket {
        if query.is_unscoped() {
            tracing::debug!("Unscoped search, the service will match everything");
        }
        self.issued += 1;
        if let Some(stale) = self.pending.replace(self.issued) {
            tracing::debug!("Search {} superseded by {}", stale, self.issued);
        }
        self.query = query.clone();
        SearchTicket {
            token: self.issued,
            query,
        }
    }

    /// Apply a search result if its ticket is still the latest one.
    pub fn apply(&mut self, response: SearchResponse) -> Resolution {
        if self.pending != Some(response.token) {
            tracing::warn!("Dropping stale search response {}", response.token);
            return Resolution::Superseded;
        }
        self.pending = None;

        match response.result {
            Ok(facilities) => {
                tracing::info!(
                    "Search {:?} matched {} facilities",
                    response.query.text,
                    facilities.len()
                );
                self.results = Some(SearchResultSet {
                    query: response.query,
                    facilities,
                });
                self.current_page = 1;
                self.last_error = None;
                Resolution::Applied
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.last_error = Some(e);
                Resolution::Failed
            }
        }
    }

    /// Begin, fetch and apply in one go.
    pub async fn run(&mut self, gateway: &dyn FetchGateway, query: SearchQuery) -> Resolution {
        let ticket = self.begin(query);
        let response = ticket.fetch(gateway).await;
        self.apply(response)
    }

    /// Drop query, results and any search in flight.
    pub fn clear(&mut self) {
        self.query = SearchQuery::default();
        self.results = None;
        self.current_page = 1;
        self.last_error = None;
        self.pending = None;
    }
}
