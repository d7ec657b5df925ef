//! peds-client - Query compilation and pagination for the patent application data service
//!
//! Turns structured filters into the backend's search-text query language,
//! plans offset/limit fetch windows, and streams records a page at a time
//! through a caller-supplied fetch capability.

pub mod cli;
pub mod config;
pub mod fields;
pub mod manager;
pub mod observability;
pub mod pagination;
pub mod query;

pub use config::{ClientConfig, ConfigError};
pub use fields::{Field, FieldRegistry, PedsFields};
pub use manager::{ApplicationManager, ManagerError};
pub use pagination::{FetchCapability, FetchWindow, Page, RecordFactory};
pub use query::{CompiledQuery, Filter, FilterValue, QueryCompiler, QueryError};
