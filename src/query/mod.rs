//! # Query Module
//!
//! Filter mapping, value normalization, date range merging and compilation
//! into the backend's query syntax.

pub mod compiler;
pub mod errors;
pub mod filter;
pub mod range;
pub mod value;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use errors::{QueryError, QueryResult};
pub use filter::{Filter, SortDirection, SortSpec, RAW_QUERY_KEY};
pub use range::{BoundOp, DateBound, RangeClause, RangeEnd, RangeMerger};
pub use value::{FilterValue, Scalar};
