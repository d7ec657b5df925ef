//! CLI command implementations
//!
//! Each command builds its response as JSON. `run_command` writes it to
//! stdout as `{"status":"ok","data":...}`. Rejected requests are written as
//! `{"status":"error",...}` on stdout; configuration and I/O failures are
//! returned to the caller.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::fields::{Field, FieldRegistry, PedsFields};
use crate::manager::ApplicationManager;
use crate::pagination::{self, FetchWindow};
use crate::query::Filter;

use super::args::Command;
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{read_request, write_error, write_response};

/// Body of a `compile` request
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileRequest {
    /// Filter object, keys as accepted by `ApplicationManager::filter`
    pub filter: Value,

    /// Sort tokens, `"field"` or `"-field"`
    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(default)]
    pub limit: Option<u64>,

    #[serde(default)]
    pub offset: u64,
}

/// Run CLI with parsed arguments
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Compile { config } => {
            let config = load_config(config.as_deref())?;
            let request = read_request()?;
            compile(&config, request)
        }
        Command::Windows {
            limit,
            offset,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            Ok(windows(&config, limit, offset))
        }
        Command::Fields => Ok(fields()),
    };

    match result {
        Ok(data) => write_response(data),
        Err(e) if is_rejection(&e) => write_error(e.code_str(), e.message()),
        Err(e) => Err(e),
    }
}

fn is_rejection(err: &CliError) -> bool {
    matches!(
        err.code(),
        CliErrorCode::InvalidRequest | CliErrorCode::QueryRejected
    )
}

/// Loads the config file, or the defaults when none is given, and applies
/// its log level.
fn load_config(path: Option<&Path>) -> CliResult<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    config.apply_logging()?;
    Ok(config)
}

/// Compiles a request into the backend request body for its first page
pub fn compile(config: &ClientConfig, request: Value) -> CliResult<Value> {
    let request: CompileRequest = serde_json::from_value(request)
        .map_err(|e| CliError::invalid_request(format!("Invalid compile request: {}", e)))?;

    let filter = Filter::from_json(&request.filter)?;

    let mut manager = ApplicationManager::new()
        .with_client_config(config.clone())
        .offset(request.offset);
    for (key, value) in filter.iter() {
        manager = manager.filter(key, value.clone());
    }
    for token in request.order_by {
        manager = manager.order_by(token);
    }
    if let Some(limit) = request.limit {
        manager = manager.limit(limit);
    }

    let compiled = manager.compile()?;
    let first_window =
        pagination::windows(request.limit, request.offset, config.page_size).next();

    Ok(json!({
        "compiled": compiled,
        "request": compiled.request_body(first_window),
        "count_request": compiled.request_body(None),
    }))
}

/// Every window a stream would request if no page came back short
pub fn windows(config: &ClientConfig, limit: u64, offset: u64) -> Value {
    let windows: Vec<FetchWindow> =
        pagination::windows(Some(limit), offset, config.page_size).collect();
    json!({
        "page_size": config.page_size,
        "windows": windows,
    })
}

/// Accepted filter names, and which of them are date fields
pub fn fields() -> Value {
    let registry = PedsFields;
    let names = registry.list_field_names();
    let dates: Vec<&str> = Field::ALL
        .iter()
        .filter(|field| field.is_date())
        .map(|field| field.canonical())
        .collect();

    json!({
        "fields": names,
        "date_fields": dates,
    })
}
