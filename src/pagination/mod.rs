//! # Pagination Module
//!
//! Fetch window planning and lazy async streaming of backend pages.

pub mod cursor;
pub mod fetch;
pub mod stream;

pub use cursor::{windows, FetchWindow, PageCursor, DEFAULT_PAGE_SIZE};
pub use fetch::{BoxFuture, FetchCapability, Page, RecordFactory};
pub use stream::{count, stream, typed_stream, MaterializeError, ResultStream};
