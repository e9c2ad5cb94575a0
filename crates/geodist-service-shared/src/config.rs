//! Service configuration.
//!
//! Values are resolved in priority order:
//!
//! 1. Command-line flag, then environment variable (both parsed by the
//!    binary and handed over as [`ConfigOverrides`])
//! 2. The optional JSON config file
//! 3. Built-in defaults
//!
//! # Config File
//!
//! ```json
//! {
//!   "port": 5050,
//!   "deliver_man_loc": [{"lat": 55.6, "lng": 12.6}],
//!   "source": {"lat": 55.545454, "lng": 12.5465465},
//!   "order": "input",
//!   "concurrency": "bounded"
//! }
//! ```
//!
//! `deliver_man_loc` may be given either as a JSON array or as a string
//! holding the JSON array. It is kept as raw text and decoded per request.
//!
//! `source` may name only one of `lat` or `lng`; the other keeps its default.
//! `request_timeout_secs` and `shutdown_timeout_secs` bound request handling
//! and the graceful shutdown drain.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use geodist_lib::{Concurrency, Coordinate, FanOutOptions, ResultOrder, SourceLocation};

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5050;

/// Reference point used when none is configured.
pub const DEFAULT_SOURCE: SourceLocation = Coordinate::new(55.545454, 12.5465465);

/// Longest a single request may run before it is answered with `408`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest the server waits for open connections after a shutdown signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An `order` or `concurrency` value in the config file was not understood.
    #[error(transparent)]
    InvalidOption(#[from] geodist_lib::Error),
}

/// Keys accepted in the JSON config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub port: Option<u16>,
    pub deliver_man_loc: Option<Value>,
    pub source: Option<SourceFile>,
    pub order: Option<String>,
    pub concurrency: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

/// The `source` key of the config file. Either coordinate may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFile {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl ConfigFile {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Candidate list as raw JSON text.
    fn candidates_json(&self) -> Option<String> {
        self.deliver_man_loc.as_ref().map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub deliver_man_loc: Option<String>,
    pub source_lat: Option<f64>,
    pub source_lng: Option<f64>,
    pub order: Option<ResultOrder>,
    pub concurrency: Option<Concurrency>,
    pub request_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Candidate list as raw JSON text. May be empty or malformed; that is
    /// reported per request, not at startup.
    pub candidates_json: String,
    /// Reference point distances are measured from.
    pub source: SourceLocation,
    /// Fan-out ordering and concurrency.
    pub fan_out: FanOutOptions,
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// Deadline for draining connections on shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            candidates_json: String::new(),
            source: DEFAULT_SOURCE,
            fan_out: FanOutOptions::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from overrides, the config file they name (if
    /// any), and defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(overrides, file)
    }

    fn merge(overrides: ConfigOverrides, file: ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let file_order: Option<ResultOrder> = file.order.as_deref().map(str::parse).transpose()?;
        let file_concurrency: Option<Concurrency> =
            file.concurrency.as_deref().map(str::parse).transpose()?;
        let file_source = file.source.unwrap_or_default();

        Ok(Self {
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            candidates_json: overrides
                .deliver_man_loc
                .or_else(|| file.candidates_json())
                .unwrap_or(defaults.candidates_json),
            source: Coordinate::new(
                overrides
                    .source_lat
                    .or(file_source.lat)
                    .unwrap_or(defaults.source.lat),
                overrides
                    .source_lng
                    .or(file_source.lng)
                    .unwrap_or(defaults.source.lng),
            ),
            fan_out: FanOutOptions {
                order: overrides
                    .order
                    .or(file_order)
                    .unwrap_or(defaults.fan_out.order),
                concurrency: overrides
                    .concurrency
                    .or(file_concurrency)
                    .unwrap_or(defaults.fan_out.concurrency),
            },
            request_timeout: overrides
                .request_timeout_secs
                .or(file.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            shutdown_timeout: overrides
                .shutdown_timeout_secs
                .or(file.shutdown_timeout_secs)
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
        })
    }
}
