//! JSON response envelope shared by every API endpoint.
//!
//! Every `/api` response, success or failure, has the same shape:
//!
//! ```json
//! {"code": "", "error": "Success Message", "details": [6.93]}
//! {"code": "CALCULATE", "error": "Calculate error", "details": null}
//! ```
//!
//! `code` is empty on success. `error` carries the human-readable message
//! in both cases.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;

/// Message reported in the `error` field of successful responses.
pub const SUCCESS_MESSAGE: &str = "Success Message";

/// Response body plus the HTTP status it is sent with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code, empty on success.
    pub code: String,

    /// Human-readable message.
    #[serde(rename = "error")]
    pub message: String,

    /// Payload on success, `null` on failure.
    pub details: Option<T>,

    #[serde(skip, default = "default_status")]
    status: u16,
}

fn default_status() -> u16 {
    StatusCode::OK.as_u16()
}

impl<T> ApiResponse<T> {
    /// Create a `200 OK` response carrying `details`.
    pub fn success(details: T) -> Self {
        Self {
            code: String::new(),
            message: SUCCESS_MESSAGE.to_string(),
            details: Some(details),
            status: StatusCode::OK.as_u16(),
        }
    }

    /// Create a failure response for a known error code.
    pub fn failure(code: ErrorCode, status: StatusCode) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: code.message().to_string(),
            details: None,
            status: status.as_u16(),
        }
    }

    /// HTTP status this response is sent with.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        self.code.is_empty()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serialization() {
        let response = ApiResponse::success(vec![1.5, 0.0]);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({"code": "", "error": "Success Message", "details": [1.5, 0.0]})
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.is_success());
    }

    #[test]
    fn test_failure_serialization() {
        let response =
            ApiResponse::<Vec<f64>>::failure(ErrorCode::Calculate, StatusCode::BAD_REQUEST);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({"code": "CALCULATE", "error": "Calculate error", "details": null})
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.is_success());
    }

    #[test]
    fn test_status_not_serialized() {
        let json = serde_json::to_string(&ApiResponse::success(1)).unwrap();
        assert!(!json.contains("status"));
    }

    #[test]
    fn test_deserialization_defaults_status() {
        let json = r#"{"code":"","error":"Success Message","details":[2.0]}"#;
        let response: ApiResponse<Vec<f64>> = serde_json::from_str(json).unwrap();
        assert_eq!(response.details, Some(vec![2.0]));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = ApiResponse::<()>::failure(ErrorCode::Calculate, StatusCode::BAD_REQUEST)
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
