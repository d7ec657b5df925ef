//! Application query manager
//!
//! An immutable builder over filter, sort, limit and offset. Every builder
//! call returns a new manager; compiling and streaming never mutate it.
//!
//! ```ignore
//! let apps = ApplicationManager::new()
//!     .filter("filing_date__gte", "2020-01-01")
//!     .order_by("-filing_date")
//!     .limit(45);
//! let mut records = apps.stream(&client)?;
//! while let Some(record) = records.next().await { ... }
//! ```

use std::collections::BTreeSet;

use futures_util::{StreamExt, TryStreamExt};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::fields::{Field, FieldRegistry, PedsFields};
use crate::pagination::{self, FetchCapability, ResultStream};
use crate::query::{CompiledQuery, Filter, FilterValue, QueryError, QueryResult, SortSpec, RAW_QUERY_KEY};

/// Field that bare values filter on
pub const DEFAULT_FILTER_FIELD: Field = Field::ApplId;

/// Errors from manager operations that reach the backend
#[derive(Debug, Error)]
pub enum ManagerError<E: std::error::Error + 'static> {
    /// Filter or sort rejected before any request
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend failure, unchanged
    #[error("fetch failed: {0}")]
    Fetch(#[source] E),

    /// `get` matched nothing
    #[error("No application matches the query")]
    NotFound,

    /// `get` matched more than one record
    #[error("More than one application matches the query")]
    MultipleResults,
}

/// The logical query a manager describes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerConfig {
    pub filter: Filter,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: u64,
}

/// Query builder and entry point for streaming application records
#[derive(Debug, Clone)]
pub struct ApplicationManager<R: FieldRegistry = PedsFields> {
    registry: R,
    client: ClientConfig,
    config: ManagerConfig,
}

impl ApplicationManager<PedsFields> {
    pub fn new() -> Self {
        Self::with_registry(PedsFields)
    }
}

impl Default for ApplicationManager<PedsFields> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FieldRegistry> ApplicationManager<R> {
    pub fn with_registry(registry: R) -> Self {
        Self {
            registry,
            client: ClientConfig::default(),
            config: ManagerConfig::default(),
        }
    }

    /// Uses page size and minimum match values from `client`
    pub fn with_client_config(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.config.filter.insert(key, value);
        self
    }

    /// Filters on the default field (`appl_id`)
    pub fn filter_default(self, value: impl Into<FilterValue>) -> Self {
        self.filter(DEFAULT_FILTER_FIELD.canonical(), value)
    }

    /// Sends `text` to the backend verbatim, ignoring all other filters
    pub fn query(self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        self.filter(RAW_QUERY_KEY, text)
    }

    /// Appends a sort token (`"field"` or `"-field"`)
    pub fn order_by(mut self, token: impl Into<String>) -> Self {
        self.config.order_by.push(token.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.config.offset = offset;
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client
    }

    /// Every user-facing name accepted as a filter
    pub fn allowed_filters(&self) -> BTreeSet<&'static str> {
        self.registry.list_field_names()
    }

    /// Rejects unknown filter and sort keys
    pub fn validate(&self) -> QueryResult<()> {
        self.config.filter.validate(&self.registry)?;
        for token in &self.config.order_by {
            SortSpec::parse(token, &self.registry)?;
        }
        Ok(())
    }

    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        self.validate()?;
        self.client
            .compiler(&self.registry)
            .compile(&self.config.filter, self.config.order_by.as_slice())
    }

    /// Compiles, then streams every matching record.
    ///
    /// Query errors are returned here, before any request is issued.
    pub fn stream<'a, F: FetchCapability>(
        &self,
        fetch: &'a F,
    ) -> QueryResult<ResultStream<'a, F::Record, F::Error>> {
        let query = self.compile()?;
        Ok(pagination::stream(
            query,
            fetch,
            self.config.limit,
            self.config.offset,
            self.client.page_size,
        ))
    }

    /// Number of records `stream` would yield, from the total count alone
    pub async fn len<F: FetchCapability>(&self, fetch: &F) -> Result<u64, ManagerError<F::Error>> {
        let query = self.compile()?;
        pagination::count(&query, fetch, self.config.limit, self.config.offset)
            .await
            .map_err(ManagerError::Fetch)
    }

    /// The first matching record, fetched with a single one-row request
    pub async fn first<F: FetchCapability>(
        &self,
        fetch: &F,
    ) -> Result<Option<F::Record>, ManagerError<F::Error>> {
        let limit = self.config.limit.map_or(1, |limit| limit.min(1));
        let query = self.compile()?;
        let mut records = pagination::stream(query, fetch, Some(limit), self.config.offset, 1);

        records.next().await.transpose().map_err(ManagerError::Fetch)
    }

    /// The single matching record
    pub async fn get<F: FetchCapability>(&self, fetch: &F) -> Result<F::Record, ManagerError<F::Error>> {
        let query = self.compile()?;
        let limit = self.config.limit.map_or(2, |limit| limit.min(2));
        let records: Vec<F::Record> =
            pagination::stream(query, fetch, Some(limit), self.config.offset, 2)
                .try_collect()
                .await
                .map_err(ManagerError::Fetch)?;

        let mut records = records.into_iter();
        match (records.next(), records.next()) {
            (Some(record), None) => Ok(record),
            (None, _) => Err(ManagerError::NotFound),
            (Some(_), Some(_)) => Err(ManagerError::MultipleResults),
        }
    }

    /// Checks whether the backend is reachable
    pub async fn is_online<F: FetchCapability>(&self, fetch: &F) -> Result<bool, F::Error> {
        fetch.is_online().await
    }
}
