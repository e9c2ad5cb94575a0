//! geodist distance list HTTP microservice.
//!
//! Serves the great-circle distance from a fixed source coordinate to every
//! coordinate in a configured candidate list.
//!
//! # Endpoints
//!
//! - `GET /api/v1/list` - Distances from the source to each candidate
//! - `GET /health/live` - Kubernetes liveness probe
//! - `GET /health/ready` - Kubernetes readiness probe
//! - `GET /metrics` - Prometheus metrics (path set by `METRICS_PATH`)
//!
//! # Configuration
//!
//! Flags take precedence over environment variables, which take precedence
//! over the `--config` file:
//!
//! - `--port` / `SERVICE_PORT` - HTTP port (default: 5050)
//! - `--config` / `GEODIST_CONFIG` - JSON config file
//! - `--deliver-man-loc` / `DELIVER_MAN_LOC` - Candidate list JSON
//! - `--source-lat`, `--source-lng` / `SOURCE_LAT`, `SOURCE_LNG` - Source coordinate
//! - `--order` / `RESULT_ORDER` - `input` (default) or `completion`
//! - `--concurrency` / `FANOUT_CONCURRENCY` - `bounded` (default), `unbounded`, or a worker count
//! - `--request-timeout-secs` / `REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 10)
//! - `--shutdown-timeout-secs` / `SHUTDOWN_TIMEOUT_SECS` - Shutdown drain deadline (default: 5)
//! - `RUST_LOG`, `LOG_FORMAT` - Logging
//! - `METRICS_ENABLED`, `METRICS_PATH` - Metrics

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    routing::get,
    Extension, Router, ServiceExt,
};
use clap::Parser;
use tokio::sync::Notify;
use tower_http::normalize_path::NormalizePath;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use geodist_lib::{Concurrency, DistanceResultSet, Error as LibError, ResultOrder};
use geodist_service_shared::{
    from_lib_error, health_live, health_ready, init_logging, init_metrics, metrics_handler,
    record_distances_computed, record_request_failed, ApiResponse, AppState, ConfigOverrides,
    LoggingConfig, MetricsConfig, MetricsError, RequestId, RequestTrackingLayer, ServiceConfig,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serve great-circle distances from a fixed source to configured candidates"
)]
struct Cli {
    /// HTTP listen port.
    #[arg(long, env = "SERVICE_PORT")]
    port: Option<u16>,

    /// JSON config file.
    #[arg(long, env = "GEODIST_CONFIG")]
    config: Option<PathBuf>,

    /// Candidate list as JSON, e.g. '[{"lat":55.6,"lng":12.6}]'.
    #[arg(long = "deliver-man-loc", alias = "deliver_man_loc", env = "DELIVER_MAN_LOC")]
    deliver_man_loc: Option<String>,

    /// Source latitude in degrees.
    #[arg(long, env = "SOURCE_LAT", allow_negative_numbers = true)]
    source_lat: Option<f64>,

    /// Source longitude in degrees.
    #[arg(long, env = "SOURCE_LNG", allow_negative_numbers = true)]
    source_lng: Option<f64>,

    /// Result order: input or completion.
    #[arg(long, env = "RESULT_ORDER")]
    order: Option<ResultOrder>,

    /// Fan-out concurrency: bounded, unbounded, or a worker count.
    #[arg(long, env = "FANOUT_CONCURRENCY")]
    concurrency: Option<Concurrency>,

    /// Seconds a request may run before it is answered with 408.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Seconds to wait for open connections after a shutdown signal.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS")]
    shutdown_timeout_secs: Option<u64>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            port: cli.port,
            config: cli.config,
            deliver_man_loc: cli.deliver_man_loc,
            source_lat: cli.source_lat,
            source_lng: cli.source_lng,
            order: cli.order,
            concurrency: cli.concurrency,
            request_timeout_secs: cli.request_timeout_secs,
            shutdown_timeout_secs: cli.shutdown_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env().with_service(env!("CARGO_PKG_NAME"));
    init_logging(&logging).context("failed to initialise logging")?;

    let config = ServiceConfig::resolve(cli.into()).context("failed to resolve configuration")?;

    let metrics = MetricsConfig::from_env();
    match init_metrics(&metrics) {
        Ok(()) => info!(path = %metrics.path, "metrics enabled"),
        Err(MetricsError::Disabled) => info!("metrics disabled"),
        Err(e) => warn!(error = %e, "metrics unavailable"),
    }

    let service = logging
        .service
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let state = AppState::new(&config).with_service(service, env!("CARGO_PKG_VERSION"));
    match state.candidates() {
        Ok(candidates) => info!(candidates = candidates.len(), "candidate list decoded"),
        Err(e) => warn!(
            error = %e,
            "candidate list does not decode; /api/v1/list will answer 400 until it is fixed"
        ),
    }

    let application = app(router(state, &metrics, config.request_timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        addr = %addr,
        source_lat = config.source.lat,
        source_lng = config.source.lng,
        order = %config.fan_out.order,
        concurrency = %config.fan_out.concurrency,
        request_timeout_secs = config.request_timeout.as_secs_f64(),
        "starting geodist service"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let draining = Arc::new(Notify::new());
    let shutdown = {
        let draining = Arc::clone(&draining);
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    };
    let server = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(application),
    )
    .with_graceful_shutdown(shutdown)
    .into_future();

    serve_with_deadline(server, &draining, config.shutdown_timeout)
        .await
        .context("server terminated unexpectedly")?;

    info!("shutdown complete");
    Ok(())
}

/// Build the application router.
fn router(state: AppState, metrics: &MetricsConfig, request_timeout: Duration) -> Router {
    let mut routes = Router::new()
        .route("/api/v1/list", get(list_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready));

    if metrics.enabled {
        routes = routes.route(&metrics.path, get(metrics_handler));
    }

    with_middleware(routes, request_timeout).with_state(state)
}

fn with_middleware(routes: Router<AppState>, request_timeout: Duration) -> Router<AppState> {
    routes
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(RequestTrackingLayer)
}

/// Wrap the router so `/api/v1/list/` is routed like `/api/v1/list`.
///
/// Path normalization has to run before routing, so it wraps the whole
/// router instead of being added with `Router::layer`.
fn app(router: Router) -> NormalizePath<Router> {
    NormalizePath::trim_trailing_slash(router)
}

/// Handle GET /api/v1/list requests.
async fn list_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResponse<DistanceResultSet> {
    let options = state.fan_out().options();

    match state.distances().await {
        Ok(distances) => {
            record_distances_computed(
                distances.len(),
                options.order.as_str(),
                &options.concurrency.to_string(),
            );
            info!(
                request_id = %request_id,
                candidates = distances.len(),
                order = %options.order,
                concurrency = %options.concurrency,
                "distances computed"
            );
            ApiResponse::success(distances)
        }
        Err(e) => {
            let reason = match &e {
                LibError::InvalidCandidates(_) => "invalid_candidates",
                LibError::IncompleteResults { .. } => "incomplete_results",
                LibError::UnsupportedOption { .. } => "unsupported_option",
            };
            record_request_failed(reason);
            if matches!(e, LibError::IncompleteResults { .. }) {
                error!(request_id = %request_id, error = %e, "distance fan-out failed");
            } else {
                warn!(request_id = %request_id, error = %e, "distance list rejected");
            }
            from_lib_error(&e)
        }
    }
}

/// Drive `server` to completion, giving it at most `deadline` to drain once
/// `draining` is notified.
async fn serve_with_deadline<F, E>(
    server: F,
    draining: &Notify,
    deadline: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result,
        _ = draining.notified() => match tokio::time::timeout(deadline, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    deadline_secs = deadline.as_secs_f64(),
                    "shutdown deadline passed, closing remaining connections"
                );
                Ok(())
            }
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
