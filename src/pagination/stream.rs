//! Lazy result streaming over a fetch capability
//!
//! Pages are requested strictly one at a time, in increasing offset order.
//! The stream ends when:
//! - a page comes back shorter than requested
//! - the window end reaches the backend's reported total
//! - the configured limit has been yielded
//! - the backend returns an error (yielded once, then the stream ends)
//!
//! Dropping the stream part-way through is always valid.

use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use super::cursor::{FetchWindow, PageCursor};
use super::fetch::{FetchCapability, RecordFactory};
use crate::observability::{Event, Logger};
use crate::query::CompiledQuery;

/// Stream of raw records, or the capability's error
pub type ResultStream<'a, R, E> = BoxStream<'a, Result<R, E>>;

/// Per-iteration state. Owned by the stream, dropped with it.
struct ResultCursor<'a, F: FetchCapability> {
    query_id: Uuid,
    query: CompiledQuery,
    fetch: &'a F,
    windows: PageCursor,
    buffer: VecDeque<F::Record>,
    yielded: u64,
    done: bool,
    failed: bool,
}

impl<'a, F: FetchCapability> ResultCursor<'a, F> {
    fn log(&self, event: Event, window: Option<FetchWindow>, extra: &[(&str, &str)]) {
        let query_id = self.query_id.to_string();
        let yielded = self.yielded.to_string();
        let (start, rows) = match window {
            Some(w) => (w.start.to_string(), w.rows.to_string()),
            None => (String::new(), String::new()),
        };

        let mut fields = vec![("query_id", query_id.as_str()), ("yielded", yielded.as_str())];
        if window.is_some() {
            fields.push(("start", start.as_str()));
            fields.push(("rows", rows.as_str()));
        }
        fields.extend_from_slice(extra);

        match event {
            Event::StreamFailed => Logger::error(event.as_str(), &fields),
            _ => Logger::trace(event.as_str(), &fields),
        }
    }

    /// Fetches the next window into the buffer.
    ///
    /// Returns `Ok(false)` when no window remains.
    async fn fill(&mut self) -> Result<bool, F::Error> {
        let window = match self.windows.next() {
            Some(window) => window,
            None => {
                let event = if self.windows.remaining() == Some(0) {
                    Event::StreamLimitReached
                } else {
                    Event::StreamExhausted
                };
                self.log(event, None, &[]);
                return Ok(false);
            }
        };

        self.log(Event::PageRequested, Some(window), &[]);
        let page = self.fetch.fetch(&self.query, window).await?;

        let received = page.records.len() as u64;
        let total = page.total_count.to_string();
        let received_str = received.to_string();
        self.log(
            Event::PageReceived,
            Some(window),
            &[("received", received_str.as_str()), ("total", total.as_str())],
        );

        if received < window.rows || window.end() >= page.total_count {
            self.done = true;
        }

        // Rows beyond the request are never yielded
        let rows = usize::try_from(window.rows).unwrap_or(usize::MAX);
        self.buffer.extend(page.records.into_iter().take(rows));
        Ok(true)
    }

    async fn next_record(mut self) -> Option<(Result<F::Record, F::Error>, Self)> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some((Ok(record), self));
            }
            if self.done {
                if !self.failed {
                    self.log(Event::StreamExhausted, None, &[]);
                }
                return None;
            }

            match self.fill().await {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    let message = err.to_string();
                    self.log(Event::StreamFailed, None, &[("message", message.as_str())]);
                    self.done = true;
                    self.failed = true;
                    self.buffer.clear();
                    return Some((Err(err), self));
                }
            }
        }
    }
}

/// Streams every record of `query`, `page_size` rows per request.
///
/// `limit` caps the number of records yielded; `offset` skips leading
/// records on the backend side.
pub fn stream<'a, F: FetchCapability>(
    query: CompiledQuery,
    fetch: &'a F,
    limit: Option<u64>,
    offset: u64,
    page_size: u64,
) -> ResultStream<'a, F::Record, F::Error> {
    let cursor = ResultCursor {
        query_id: Uuid::new_v4(),
        query,
        fetch,
        windows: PageCursor::new(limit, offset, page_size),
        buffer: VecDeque::new(),
        yielded: 0,
        done: false,
        failed: false,
    };

    stream::unfold(cursor, ResultCursor::next_record).boxed()
}

/// Number of records a stream with the same arguments would yield.
///
/// Requests only the total count, never a page of records.
pub async fn count<F: FetchCapability>(
    query: &CompiledQuery,
    fetch: &F,
    limit: Option<u64>,
    offset: u64,
) -> Result<u64, F::Error> {
    let total = fetch.total_count(query).await?;
    let available = total.saturating_sub(offset);
    Ok(match limit {
        Some(limit) => available.min(limit),
        None => available,
    })
}

/// Error from a typed stream
#[derive(Debug, Error)]
pub enum MaterializeError<F, B>
where
    F: std::error::Error + 'static,
    B: std::error::Error + 'static,
{
    /// The backend failed
    #[error("fetch failed: {0}")]
    Fetch(#[source] F),

    /// A raw record could not be converted
    #[error("record conversion failed: {0}")]
    Build(#[source] B),
}

/// Applies a [`RecordFactory`] to every record of a raw stream
pub fn typed_stream<'a, R, E, T>(
    raw: ResultStream<'a, R, E>,
    factory: &'a T,
) -> BoxStream<'a, Result<T::Record, MaterializeError<E, T::Error>>>
where
    R: Send + 'a,
    E: std::error::Error + Send + 'static,
    T: RecordFactory<Raw = R>,
    T::Record: Send + 'a,
{
    raw.map(move |item| {
        item.map_err(MaterializeError::Fetch)
            .and_then(|record| factory.build(record).map_err(MaterializeError::Build))
    })
    .boxed()
}
