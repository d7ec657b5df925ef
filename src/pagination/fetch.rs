//! Backend collaborator seams
//!
//! The transport, its retries and authentication live behind
//! [`FetchCapability`]. Turning raw backend records into caller-facing
//! types lives behind [`RecordFactory`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::cursor::FetchWindow;
use crate::query::CompiledQuery;

/// Boxed future returned by the collaborator traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One page of backend results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Records in backend order
    pub records: Vec<R>,
    /// Total number of records matching the query
    pub total_count: u64,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>, total_count: u64) -> Self {
        Self {
            records,
            total_count,
        }
    }
}

/// Async access to the remote search backend.
///
/// For a fixed query and window the returned records must be in a stable
/// order. Errors are opaque to the caller and surface unchanged.
pub trait FetchCapability: Send + Sync {
    /// Raw record type
    type Record: Send + 'static;
    /// Transport/backend error
    type Error: std::error::Error + Send + 'static;

    /// Fetches the records in `window`
    fn fetch<'a>(
        &'a self,
        query: &'a CompiledQuery,
        window: FetchWindow,
    ) -> BoxFuture<'a, Result<Page<Self::Record>, Self::Error>>;

    /// Requests only the number of matching records
    fn total_count<'a>(&'a self, query: &'a CompiledQuery) -> BoxFuture<'a, Result<u64, Self::Error>>;

    /// Checks whether the backend is reachable
    fn is_online(&self) -> BoxFuture<'_, Result<bool, Self::Error>>;
}

impl<T: FetchCapability + ?Sized> FetchCapability for Arc<T> {
    type Record = T::Record;
    type Error = T::Error;

    fn fetch<'a>(
        &'a self,
        query: &'a CompiledQuery,
        window: FetchWindow,
    ) -> BoxFuture<'a, Result<Page<Self::Record>, Self::Error>> {
        (**self).fetch(query, window)
    }

    fn total_count<'a>(&'a self, query: &'a CompiledQuery) -> BoxFuture<'a, Result<u64, Self::Error>> {
        (**self).total_count(query)
    }

    fn is_online(&self) -> BoxFuture<'_, Result<bool, Self::Error>> {
        (**self).is_online()
    }
}

/// Converts raw backend records into caller-facing records
pub trait RecordFactory: Send + Sync {
    type Raw;
    type Record;
    type Error: std::error::Error + Send + 'static;

    fn build(&self, raw: Self::Raw) -> Result<Self::Record, Self::Error>;
}
