//! Search sessions: the active query, its page window and query history.
use crate::engine::{Engine, EngineOutcome};
use crate::error::{RecollOutlineError, Result};
use crate::formatter::{FormattedDocument, ResultFormatter};
use crate::query::Query;
use crate::report::{parse_header, parse_listing};
use log::{debug, info};
use serde::Serialize;
use std::collections::VecDeque;

/// Zero-based `[start, end)` slice of the ranked result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    start: usize,
    end: usize,
    page_size: usize,
}

impl PageWindow {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            start: 0,
            end: page_size,
            page_size,
        }
    }

    /// Window showing the zero-based `page`; refused when it lies past
    /// any addressable result.
    pub fn at_page(page_size: usize, page: usize) -> Result<Self> {
        let mut window = Self::new(page_size);
        let start = page
            .checked_mul(window.page_size)
            .filter(|start| start.checked_add(window.page_size).is_some())
            .ok_or_else(|| {
                RecollOutlineError::InvalidNavigation(format!("Page {page} is out of range"))
            })?;
        window.start = start;
        window.end = start + window.page_size;
        Ok(window)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn advance(&mut self) -> Result<()> {
        let end = self.end.checked_add(self.page_size).ok_or_else(|| {
            RecollOutlineError::InvalidNavigation("No further results".to_string())
        })?;
        self.start = self.end;
        self.end = end;
        Ok(())
    }

    /// Moves one page back; refused when already at the first result.
    pub fn retreat(&mut self) -> Result<()> {
        if self.start == 0 {
            return Err(RecollOutlineError::InvalidNavigation(
                "Already at the beginning of the results".to_string(),
            ));
        }
        self.end = self.start;
        self.start = self.start.saturating_sub(self.page_size);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.start = 0;
        self.end = self.page_size;
    }

    pub fn label(&self) -> String {
        format!("Results: {} - {}", self.start, self.end)
    }
}

/// One submitted query and where the user is in its results.
#[derive(Debug, Clone)]
pub struct SearchSession {
    query: Query,
    window: PageWindow,
}

impl SearchSession {
    pub fn new(query: Query, page_size: usize) -> Self {
        Self {
            query,
            window: PageWindow::new(page_size),
        }
    }

    pub fn with_window(query: Query, window: PageWindow) -> Self {
        Self { query, window }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    /// Runs header and results invocations for the current window.
    pub fn fetch(
        &self,
        engine: &dyn Engine,
        formatter: &ResultFormatter,
    ) -> Result<FormattedDocument> {
        self.fetch_window(&self.window, engine, formatter)
    }

    fn fetch_window(
        &self,
        window: &PageWindow,
        engine: &dyn Engine,
        formatter: &ResultFormatter,
    ) -> Result<FormattedDocument> {
        info!("Querying '{}' ({})", self.query, window.label());
        let header = engine.header(&self.query).into_text()?;
        let results = engine.results(&self.query, window);
        if matches!(results, EngineOutcome::Empty) {
            debug!("No matches in {}", window.label());
        }
        let results = results.into_text()?;

        Ok(formatter.build(
            self.query.as_str(),
            &self.query.reduced(),
            window.bounds(),
            parse_header(&header),
            parse_listing(&results),
        ))
    }

    /// The window only moves once the new page has been fetched.
    pub fn next_page(
        &mut self,
        engine: &dyn Engine,
        formatter: &ResultFormatter,
    ) -> Result<FormattedDocument> {
        let mut window = self.window;
        window.advance()?;
        debug!("Advancing to {}", window.label());
        let document = self.fetch_window(&window, engine, formatter)?;
        self.window = window;
        Ok(document)
    }

    /// Leaves the window untouched when already on the first page or when
    /// the engine fails.
    pub fn previous_page(
        &mut self,
        engine: &dyn Engine,
        formatter: &ResultFormatter,
    ) -> Result<FormattedDocument> {
        let mut window = self.window;
        window.retreat()?;
        debug!("Moving back to {}", window.label());
        let document = self.fetch_window(&window, engine, formatter)?;
        self.window = window;
        Ok(document)
    }
}

/// Queries submitted during this process, oldest first.
#[derive(Debug, Clone)]
pub struct QueryHistory {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl QueryHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&mut self, query: &str) {
        if self.entries.back().map(String::as_str) == Some(query) {
            return;
        }
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(query.to_string());
    }

    /// One-based lookup, matching the numbering `iter` is shown with.
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
