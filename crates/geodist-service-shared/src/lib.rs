//! Shared infrastructure for the geodist HTTP service.
//!
//! - [`AppState`]: Source coordinate, candidate list, and fan-out engine
//! - [`ServiceConfig`]: Configuration resolved from flags, env, and file
//! - [`ApiResponse`]: The `{code, error, details}` response envelope
//! - [`ErrorCode`]: Wire error codes and library error mapping
//! - [`health`]: Liveness/readiness probe handlers
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request ID, tracing span, and HTTP metrics middleware
//!
//! # Architecture
//!
//! Handlers stay thin; all computation lives in `geodist-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Read source and candidate list from AppState             │
//! │  - Call geodist-lib fan-out                                 │
//! │  - Wrap result in ApiResponse                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides fixture-backed state for handler
//! testing. Enable the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

pub mod config;
mod error_code;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    ConfigError, ConfigFile, ConfigOverrides, ServiceConfig, SourceFile, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error_code::{from_lib_error, ErrorCode};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_distances_computed, record_request_failed,
    MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, RequestId, RequestTrackingLayer};
pub use response::{ApiResponse, SUCCESS_MESSAGE};
pub use state::{AppState, DEFAULT_SERVICE_NAME};
