//! Result pagination and the page-picker window.
//!
//! Everything here is pure: a [`PageWindow`] is derived from a result count,
//! a page size and a requested page, and never stored on its own.

use crate::error::NavError;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Up to this many pages every page number is shown.
const FULL_WINDOW_MAX: usize = 10;

/// Pages shown at each end of a long page range.
const EDGE_PAGES: usize = 5;

/// One slot of the page picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Position within a paged result set. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub page_size: usize,
}

impl PageWindow {
    /// Compute the window, clamping `requested_page` into `[1, total_pages]`.
    pub fn new(
        total_count: usize,
        page_size: usize,
        requested_page: usize,
    ) -> Result<Self, NavError> {
        let page_size = NonZeroUsize::new(page_size)
            .ok_or_else(|| NavError::Validation("page size must be at least 1".to_string()))?;
        Ok(Self::with_page_size(total_count, page_size, requested_page))
    }

    /// Same as [`PageWindow::new`] for a page size that cannot be zero.
    pub fn with_page_size(
        total_count: usize,
        page_size: NonZeroUsize,
        requested_page: usize,
    ) -> Self {
        let page_size = page_size.get();
        let total_pages = total_count.div_ceil(page_size).max(1);
        Self {
            current_page: requested_page.clamp(1, total_pages),
            total_pages,
            total_count,
            page_size,
        }
    }

    /// Whether a page picker should be shown at all.
    pub fn shows_controls(&self) -> bool {
        self.total_pages > 1
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Index range of the current page's items.
    pub fn item_range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(self.total_count);
        let end = (start + self.page_size).min(self.total_count);
        start..end
    }

    /// The current page's slice of `items`.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.item_range();
        let end = range.end.min(items.len());
        &items[range.start.min(end)..end]
    }

    /// Page numbers for the picker, see [`visible_pages`].
    pub fn visible_pages(&self) -> Vec<PageItem> {
        visible_pages(self.current_page, self.total_pages)
    }
}

/// Page numbers to offer in a page picker.
///
/// Short ranges list every page. Long ranges list the first five and the
/// last five pages, with an ellipsis between them while the current page
/// is before the final six.
pub fn visible_pages(current_page: usize, total_pages: usize) -> Vec<PageItem> {
    if total_pages <= FULL_WINDOW_MAX {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let mut pages: Vec<PageItem> = (1..=EDGE_PAGES).map(PageItem::Page).collect();
    if current_page < total_pages - EDGE_PAGES {
        pages.push(PageItem::Ellipsis);
    }

    let tail_start = (total_pages - (EDGE_PAGES - 1)).max(EDGE_PAGES + 1);
    for page in tail_start..=total_pages {
        if !pages.contains(&PageItem::Page(page)) {
            pages.push(PageItem::Page(page));
        }
    }
    pages
}

/// Parse a typed "jump to page" value. Only plain digits inside the range count.
pub fn parse_page_input(input: &str, total_pages: usize) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input
        .parse::<usize>()
        .ok()
        .filter(|page| (1..=total_pages).contains(page))
}
