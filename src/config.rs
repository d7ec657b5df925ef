//! Client configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to the
//! backend's defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::FieldRegistry;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::query::compiler::{DEFAULT_MINIMUM_MATCH_HIGH, DEFAULT_MINIMUM_MATCH_LOW};
use crate::query::QueryCompiler;

/// Largest page the backend serves
pub const MAX_PAGE_SIZE: u64 = 100;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "PEDS_CONFIG_READ",
            Self::Parse(_) => "PEDS_CONFIG_PARSE",
            Self::Invalid { .. } => "PEDS_CONFIG_INVALID",
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Rows per page request (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Minimum match when the broad identifier field is absent (default: "0%")
    #[serde(default = "default_minimum_match_low")]
    pub minimum_match_low: String,

    /// Minimum match when the broad identifier field is present (default: "90%")
    #[serde(default = "default_minimum_match_high")]
    pub minimum_match_high: String,

    /// Minimum log severity (default: "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_minimum_match_low() -> String {
    DEFAULT_MINIMUM_MATCH_LOW.to_string()
}

fn default_minimum_match_high() -> String {
    DEFAULT_MINIMUM_MATCH_HIGH.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            minimum_match_low: default_minimum_match_low(),
            minimum_match_high: default_minimum_match_high(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_json(&content)?;

        let page_size = config.page_size.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("log_level", config.log_level.as_str()),
                ("page_size", page_size.as_str()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ClientConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_size == 0 {
            return Err(ConfigError::invalid("page_size", "must be > 0"));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::invalid(
                "page_size",
                format!("must be <= {}", MAX_PAGE_SIZE),
            ));
        }

        validate_percentage("minimum_match_low", &self.minimum_match_low)?;
        validate_percentage("minimum_match_high", &self.minimum_match_high)?;

        self.severity()?;
        Ok(())
    }

    /// The configured minimum log severity
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|reason: String| ConfigError::invalid("log_level", reason))
    }

    /// Applies `log_level` to the process-wide logger
    pub fn apply_logging(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }

    /// A compiler using this configuration's minimum match values
    pub fn compiler<'a>(&self, registry: &'a dyn FieldRegistry) -> QueryCompiler<'a> {
        QueryCompiler::new(registry)
            .with_minimum_match(self.minimum_match_low.clone(), self.minimum_match_high.clone())
    }
}

fn validate_percentage(field: &'static str, value: &str) -> ConfigResult<()> {
    let number = value
        .strip_suffix('%')
        .ok_or_else(|| ConfigError::invalid(field, format!("'{}' must end with '%'", value)))?;

    let percent: u8 = number
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("'{}' is not a percentage", value)))?;

    if percent > 100 {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' must be between 0% and 100%", value),
        ));
    }
    Ok(())
}
