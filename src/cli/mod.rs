//! CLI module for peds
//!
//! Provides command-line interface for:
//! - compile: Compile a JSON filter request into a backend request body
//! - windows: Show the page windows a stream would request
//! - fields: List accepted filter names

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, fields, run, run_command, windows, CompileRequest};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
