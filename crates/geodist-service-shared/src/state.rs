//! Application state for the HTTP service.
//!
//! Holds the resolved source coordinate, the raw candidate JSON, and the
//! fan-out engine. Handlers reach it through axum's `State` extractor.

use std::sync::Arc;

use geodist_lib::{
    parse_candidates, CandidateLocation, DistanceResultSet, FanOut, FanOutOptions, Result,
    SourceLocation,
};

use crate::config::ServiceConfig;

/// Shared application state for all axum handlers.
///
/// Cheap to clone (`Arc` inside).
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, extract::State};
/// use geodist_service_shared::{AppState, ServiceConfig};
///
/// async fn handler(State(state): State<AppState>) {
///     let distances = state.distances().await;
///     // ...
/// }
///
/// let state = AppState::new(&ServiceConfig::default());
/// let app = Router::new()
///     .route("/api/v1/list", get(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Clone)]
struct AppStateInner {
    source: SourceLocation,
    candidates_json: String,
    fan_out: FanOut,
    service: String,
    version: String,
}

/// Name reported by the health probes unless [`AppState::with_service`] says otherwise.
pub const DEFAULT_SERVICE_NAME: &str = "geodist-service";

impl AppState {
    /// Build state from resolved configuration.
    ///
    /// The candidate JSON is stored as-is; a malformed list only surfaces
    /// when a request tries to use it.
    pub fn new(config: &ServiceConfig) -> Self {
        Self::from_components(
            config.source,
            config.candidates_json.clone(),
            config.fan_out,
        )
    }

    pub fn from_components(
        source: SourceLocation,
        candidates_json: impl Into<String>,
        options: FanOutOptions,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                source,
                candidates_json: candidates_json.into(),
                fan_out: FanOut::new(options),
                service: DEFAULT_SERVICE_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
        }
    }

    /// Set the service name and version reported by the health probes.
    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.service = name.into();
        inner.version = version.into();
        self
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// The reference point distances are measured from.
    pub fn source(&self) -> SourceLocation {
        self.inner.source
    }

    pub fn candidates_json(&self) -> &str {
        &self.inner.candidates_json
    }

    /// Decode the configured candidate list.
    pub fn candidates(&self) -> Result<Vec<CandidateLocation>> {
        parse_candidates(&self.inner.candidates_json)
    }

    pub fn fan_out(&self) -> &FanOut {
        &self.inner.fan_out
    }

    /// Decode the candidates and compute the distance to each of them.
    pub async fn distances(&self) -> Result<DistanceResultSet> {
        let candidates = self.candidates()?;
        self.inner
            .fan_out
            .compute(self.inner.source, &candidates)
            .await
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.inner.service)
            .field("source", &self.inner.source)
            .field("candidates_json_len", &self.inner.candidates_json.len())
            .field("fan_out", &self.inner.fan_out.options())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodist_lib::{Coordinate, Error, ResultOrder};

    fn state(candidates_json: &str) -> AppState {
        AppState::from_components(
            Coordinate::new(55.545454, 12.5465465),
            candidates_json,
            FanOutOptions::default(),
        )
    }

    #[test]
    fn test_app_state_from_config() {
        let config = ServiceConfig {
            candidates_json: "[]".to_string(),
            ..ServiceConfig::default()
        };
        let state = AppState::new(&config);

        assert_eq!(state.source(), config.source);
        assert_eq!(state.candidates_json(), "[]");
        assert_eq!(state.fan_out().options(), config.fan_out);
    }

    #[test]
    fn test_app_state_clone_shares_inner() {
        let state1 = state("[]");
        let state2 = state1.clone();
        assert!(Arc::ptr_eq(&state1.inner, &state2.inner));
    }

    #[test]
    fn test_app_state_service_identity() {
        let state = state("[]");
        assert_eq!(state.service(), DEFAULT_SERVICE_NAME);

        let state = state.with_service("geodist-edge", "9.9.9");
        assert_eq!(state.service(), "geodist-edge");
        assert_eq!(state.version(), "9.9.9");
    }

    #[test]
    fn test_app_state_debug() {
        let debug = format!("{:?}", state("[]"));
        assert!(debug.contains("AppState"));
        assert!(debug.contains("candidates_json_len"));
    }

    #[tokio::test]
    async fn test_distances_in_input_order() {
        let state = state(r#"[{"lat":55.545454,"lng":12.5465465},{"lat":55.6,"lng":12.6}]"#);
        let set = state.distances().await.unwrap();

        assert_eq!(set.order(), ResultOrder::Input);
        let distances = set.into_distances();
        assert_eq!(distances.len(), 2);
        assert!(distances[0].abs() < 1e-3);
        assert!(distances[1] > 6.0 && distances[1] < 8.0);
    }

    #[tokio::test]
    async fn test_distances_with_malformed_candidates() {
        let err = state("").distances().await.unwrap_err();
        assert!(matches!(err, Error::InvalidCandidates(_)));
    }
}
