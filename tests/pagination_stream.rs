//! Pagination Stream Tests
//!
//! Tests for the async result stream over an in-memory backend:
//! - Windows are requested in order, one at a time
//! - A short page ends the stream without another request
//! - Limits cap the records yielded
//! - Backend errors reach the consumer unchanged
//! - Length queries never fetch a page

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use peds_client::pagination::{self, typed_stream, BoxFuture, MaterializeError};
use peds_client::{
    ApplicationManager, ClientConfig, CompiledQuery, FetchCapability, FetchWindow, ManagerError,
    Page, RecordFactory,
};
use thiserror::Error;

// =============================================================================
// In-memory Backend
// =============================================================================

#[derive(Debug, Error, PartialEq)]
#[error("backend unavailable at start {0}")]
struct BackendError(u64);

/// Serves `records` and reports `reported_total` as the match count.
struct MemoryBackend {
    records: Vec<u64>,
    reported_total: u64,
    fail_at: Option<u64>,
    online: bool,
    requests: Mutex<Vec<FetchWindow>>,
    count_requests: AtomicUsize,
}

impl MemoryBackend {
    fn new(len: u64) -> Self {
        Self::with_total(len, len)
    }

    fn with_total(len: u64, reported_total: u64) -> Self {
        Self {
            records: (0..len).collect(),
            reported_total,
            fail_at: None,
            online: true,
            requests: Mutex::new(Vec::new()),
            count_requests: AtomicUsize::new(0),
        }
    }

    fn failing_at(mut self, start: u64) -> Self {
        self.fail_at = Some(start);
        self
    }

    fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    fn requests(&self) -> Vec<(u64, u64)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|w| (w.start, w.rows))
            .collect()
    }

    fn count_requests(&self) -> usize {
        self.count_requests.load(Ordering::SeqCst)
    }
}

impl FetchCapability for MemoryBackend {
    type Record = u64;
    type Error = BackendError;

    fn fetch<'a>(
        &'a self,
        _query: &'a CompiledQuery,
        window: FetchWindow,
    ) -> BoxFuture<'a, Result<Page<u64>, BackendError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(window);
            if self.fail_at == Some(window.start) {
                return Err(BackendError(window.start));
            }
            let records = self
                .records
                .iter()
                .skip(window.start as usize)
                .take(window.rows as usize)
                .copied()
                .collect();
            Ok(Page::new(records, self.reported_total))
        })
    }

    fn total_count<'a>(&'a self, _query: &'a CompiledQuery) -> BoxFuture<'a, Result<u64, BackendError>> {
        Box::pin(async move {
            self.count_requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.reported_total)
        })
    }

    fn is_online(&self) -> BoxFuture<'_, Result<bool, BackendError>> {
        Box::pin(async move { Ok(self.online) })
    }
}

fn applications() -> ApplicationManager {
    ApplicationManager::new().filter("filing_date__gte", "2020-01-01")
}

async fn collect_ok(manager: &ApplicationManager, backend: &MemoryBackend) -> Vec<u64> {
    manager
        .stream(backend)
        .unwrap()
        .map(|record| record.unwrap())
        .collect()
        .await
}

// =============================================================================
// Window Planning
// =============================================================================

#[tokio::test]
async fn test_limit_and_offset_windows() {
    let backend = MemoryBackend::new(1000);
    let records = collect_ok(&applications().limit(45).offset(10), &backend).await;

    assert_eq!(records.len(), 45);
    assert_eq!(records.first(), Some(&10));
    assert_eq!(records.last(), Some(&54));
    assert_eq!(backend.requests(), vec![(10, 20), (30, 20), (50, 5)]);
}

#[tokio::test]
async fn test_short_page_ends_stream() {
    // The backend over-reports its total; only the short page can stop us.
    let backend = MemoryBackend::with_total(42, 1000);
    let records = collect_ok(&applications().offset(10), &backend).await;

    assert_eq!(records.len(), 32);
    assert_eq!(&records[20..], &(30..42).collect::<Vec<_>>()[..]);
    assert_eq!(backend.requests(), vec![(10, 20), (30, 20)]);
}

#[tokio::test]
async fn test_reported_total_ends_stream() {
    let backend = MemoryBackend::new(40);
    let records = collect_ok(&applications(), &backend).await;

    assert_eq!(records, (0..40).collect::<Vec<_>>());
    assert_eq!(backend.requests(), vec![(0, 20), (20, 20)]);
}

#[tokio::test]
async fn test_configured_page_size() {
    let client = ClientConfig::from_json(r#"{"page_size": 5}"#).unwrap();
    let backend = MemoryBackend::new(100);
    let manager = applications().with_client_config(client).limit(12);
    let records = collect_ok(&manager, &backend).await;

    assert_eq!(records.len(), 12);
    assert_eq!(backend.requests(), vec![(0, 5), (5, 5), (10, 2)]);
}

#[tokio::test]
async fn test_zero_limit_requests_nothing() {
    let backend = MemoryBackend::new(100);
    let records = collect_ok(&applications().limit(0), &backend).await;

    assert!(records.is_empty());
    assert!(backend.requests().is_empty());
}

// =============================================================================
// Failure and Abandonment
// =============================================================================

#[tokio::test]
async fn test_backend_error_propagates_once() {
    let backend = MemoryBackend::new(100).failing_at(20);
    let results: Vec<Result<u64, BackendError>> =
        applications().stream(&backend).unwrap().collect().await;

    assert_eq!(results.len(), 21);
    assert!(results[..20].iter().all(|r| r.is_ok()));
    assert_eq!(results[20], Err(BackendError(20)));
    assert_eq!(backend.requests(), vec![(0, 20), (20, 20)]);
}

#[tokio::test]
async fn test_invalid_filter_fails_before_any_request() {
    let backend = MemoryBackend::new(100);
    let manager = ApplicationManager::new().filter("filing_date", vec!["2020-01-01"]);

    assert!(manager.stream(&backend).is_err());
    assert!(matches!(
        manager.len(&backend).await,
        Err(ManagerError::Query(_))
    ));
    assert!(backend.requests().is_empty());
    assert_eq!(backend.count_requests(), 0);
}

#[tokio::test]
async fn test_abandoned_stream_stops_fetching() {
    let backend = MemoryBackend::new(1000);
    {
        let taken: Vec<u64> = applications()
            .stream(&backend)
            .unwrap()
            .take(3)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(taken, vec![0, 1, 2]);
    }
    assert_eq!(backend.requests(), vec![(0, 20)]);
}

#[tokio::test]
async fn test_independent_streams_share_backend() {
    let backend = Arc::new(MemoryBackend::new(50));
    let early = applications().limit(5);
    let late = applications().offset(45);

    let (a, b) = tokio::join!(
        early.stream(&backend).unwrap().collect::<Vec<_>>(),
        late.stream(&backend).unwrap().collect::<Vec<_>>()
    );

    let a: Vec<u64> = a.into_iter().map(|r| r.unwrap()).collect();
    let b: Vec<u64> = b.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(a, vec![0, 1, 2, 3, 4]);
    assert_eq!(b, vec![45, 46, 47, 48, 49]);
}

// =============================================================================
// Length, First, Get
// =============================================================================

#[tokio::test]
async fn test_len_uses_total_count_only() {
    let backend = MemoryBackend::new(1000);

    assert_eq!(applications().limit(45).offset(10).len(&backend).await.unwrap(), 45);
    assert_eq!(applications().offset(990).len(&backend).await.unwrap(), 10);
    assert_eq!(applications().offset(2000).len(&backend).await.unwrap(), 0);

    assert_eq!(backend.count_requests(), 3);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_count_function() {
    let backend = MemoryBackend::new(30);
    let query = applications().compile().unwrap();

    assert_eq!(pagination::count(&query, &backend, None, 0).await.unwrap(), 30);
    assert_eq!(pagination::count(&query, &backend, Some(100), 10).await.unwrap(), 20);
}

#[tokio::test]
async fn test_first_requests_one_row() {
    let backend = MemoryBackend::new(100);
    let first = applications().offset(7).first(&backend).await.unwrap();

    assert_eq!(first, Some(7));
    assert_eq!(backend.requests(), vec![(7, 1)]);
}

#[tokio::test]
async fn test_first_on_empty_result() {
    let backend = MemoryBackend::new(0);
    assert_eq!(applications().first(&backend).await.unwrap(), None);
}

#[tokio::test]
async fn test_get_single_match() {
    let backend = MemoryBackend::new(1);
    assert_eq!(applications().get(&backend).await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_requires_exactly_one() {
    let none = MemoryBackend::new(0);
    assert!(matches!(
        applications().get(&none).await,
        Err(ManagerError::NotFound)
    ));

    let many = MemoryBackend::new(10);
    assert!(matches!(
        applications().get(&many).await,
        Err(ManagerError::MultipleResults)
    ));
    assert_eq!(many.requests(), vec![(0, 2)]);
}

#[tokio::test]
async fn test_is_online() {
    assert!(applications().is_online(&MemoryBackend::new(0)).await.unwrap());
    assert!(!applications()
        .is_online(&MemoryBackend::new(0).offline())
        .await
        .unwrap());
}

// =============================================================================
// Typed Records
// =============================================================================

#[derive(Debug, Error, PartialEq)]
#[error("record {0} is malformed")]
struct BuildError(u64);

struct ApplicationNumbers;

impl RecordFactory for ApplicationNumbers {
    type Raw = u64;
    type Record = String;
    type Error = BuildError;

    fn build(&self, raw: u64) -> Result<String, BuildError> {
        if raw == 2 {
            return Err(BuildError(raw));
        }
        Ok(format!("{:08}", 16000000 + raw))
    }
}

#[tokio::test]
async fn test_typed_stream() {
    let backend = MemoryBackend::new(4);
    let raw = applications().stream(&backend).unwrap();
    let results: Vec<_> = typed_stream(raw, &ApplicationNumbers).collect().await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap(), "16000000");
    assert!(matches!(
        results[2],
        Err(MaterializeError::Build(BuildError(2)))
    ));
    assert_eq!(results[3].as_ref().unwrap(), "16000003");
}
