//! Health check handlers for Kubernetes probes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses for liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Number of candidates in the configured list (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_configured: Option<usize>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            candidates_configured: None,
        }
    }

    pub fn ready(service: &str, version: &str, candidates: usize) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            candidates_configured: Some(candidates),
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            candidates_configured: None,
        }
    }
}

/// Liveness probe handler. Always 200 while the process is serving.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"geodist-service","version":"0.1.0"}
/// ```
pub async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    let status = HealthStatus::alive(state.service(), state.version());
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Returns 503 while the configured candidate list does not decode, since
/// every `/api/v1/list` request would fail.
///
/// ```text
/// GET /health/ready
/// {"status":"ok","service":"geodist-service","version":"0.1.0","candidates_configured":12}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let (service, version) = (state.service(), state.version());

    match state.candidates() {
        Ok(candidates) => {
            let status = HealthStatus::ready(service, version, candidates.len());
            (StatusCode::OK, Json(status)).into_response()
        }
        Err(e) => {
            let status = HealthStatus::not_ready(service, version, &e.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodist_lib::{Coordinate, FanOutOptions};

    #[test]
    fn test_health_status_alive() {
        let status = HealthStatus::alive("test-service", "1.0.0");
        assert_eq!(status.status, "ok");
        assert_eq!(status.service, "test-service");
        assert_eq!(status.version, "1.0.0");
        assert!(status.candidates_configured.is_none());
    }

    #[test]
    fn test_health_status_ready() {
        let status = HealthStatus::ready("test-service", "1.0.0", 3);
        assert_eq!(status.status, "ok");
        assert_eq!(status.candidates_configured, Some(3));
    }

    #[test]
    fn test_health_status_not_ready() {
        let status = HealthStatus::not_ready("test-service", "1.0.0", "bad candidates");
        assert!(status.status.starts_with("not_ready:"));
        assert!(status.status.contains("bad candidates"));
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::alive("geodist", "0.1.0")).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(!json.contains("candidates_configured"));
    }

    #[tokio::test]
    async fn test_health_ready_reflects_candidate_config() {
        let source = Coordinate::new(0.0, 0.0);
        let options = FanOutOptions::default();

        let good = AppState::from_components(source, r#"[{"lat":1,"lng":1}]"#, options);
        assert_eq!(health_ready(State(good)).await.status(), StatusCode::OK);

        let bad = AppState::from_components(source, "", options);
        assert_eq!(
            health_ready(State(bad)).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_probes_report_state_service_name() {
        let state = AppState::from_components(
            Coordinate::new(0.0, 0.0),
            "[]",
            FanOutOptions::default(),
        )
        .with_service("geodist-service", "1.2.3");

        let live = health_live(State(state.clone())).await.into_response();
        let body = axum::body::to_bytes(live.into_body(), usize::MAX).await.unwrap();
        let status: HealthStatus = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.service, "geodist-service");
        assert_eq!(status.version, "1.2.3");

        let ready = health_ready(State(state)).await;
        let body = axum::body::to_bytes(ready.into_body(), usize::MAX).await.unwrap();
        let status: HealthStatus = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.service, "geodist-service");
        assert_eq!(status.candidates_configured, Some(0));
    }
}
