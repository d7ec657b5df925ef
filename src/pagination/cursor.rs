//! Fetch window planning
//!
//! A [`PageCursor`] is a pure function of `(limit, offset, page_size)`:
//! cloning it restarts the sequence.

use serde::Serialize;

/// Page size the backend accepts by default
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// One page-sized slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    /// Offset of the first row
    pub start: u64,
    /// Number of rows requested
    pub rows: u64,
}

impl FetchWindow {
    pub fn new(start: u64, rows: u64) -> Self {
        Self { start, rows }
    }

    /// Offset one past the last requested row
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.rows)
    }
}

/// Produces successive fetch windows.
///
/// Without a limit the sequence is unbounded; the consumer stops it when the
/// backend runs out of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    next_start: u64,
    remaining: Option<u64>,
    page_size: u64,
}

impl PageCursor {
    pub fn new(limit: Option<u64>, offset: u64, page_size: u64) -> Self {
        Self {
            next_start: offset,
            remaining: limit,
            page_size,
        }
    }

    /// Rows still to be requested, if limited
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// True once the cursor will yield no more windows
    pub fn is_finished(&self) -> bool {
        self.page_size == 0 || self.remaining == Some(0)
    }
}

impl Iterator for PageCursor {
    type Item = FetchWindow;

    fn next(&mut self) -> Option<FetchWindow> {
        if self.is_finished() {
            return None;
        }

        let rows = match self.remaining {
            Some(remaining) => remaining.min(self.page_size),
            None => self.page_size,
        };
        let window = FetchWindow::new(self.next_start, rows);

        match self.next_start.checked_add(rows) {
            Some(next) => self.next_start = next,
            // Offset space exhausted
            None => self.remaining = Some(0),
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(rows);
        }

        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_finished() {
            return (0, Some(0));
        }
        match self.remaining {
            Some(remaining) => {
                let pages = usize::try_from(remaining.div_ceil(self.page_size)).unwrap_or(usize::MAX);
                (pages, Some(pages))
            }
            None => (usize::MAX, None),
        }
    }
}

/// Windows covering `limit` rows starting at `offset`
pub fn windows(limit: Option<u64>, offset: u64, page_size: u64) -> PageCursor {
    PageCursor::new(limit, offset, page_size)
}
