//! Wire error codes and the mapping from library errors.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use geodist_lib::Error as LibError;

use crate::response::ApiResponse;

/// Known failure codes reported in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The distance list could not be produced.
    Calculate,
}

impl ErrorCode {
    /// Code string sent in the `code` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Calculate => "CALCULATE",
        }
    }

    /// Message sent in the `error` field.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Calculate => "Calculate error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Convert a library error to a failure response.
///
/// Bad candidate data is the caller's configuration problem and maps to
/// `400`; a fan-out that lost results maps to `500`. Both use
/// [`ErrorCode::Calculate`].
pub fn from_lib_error<T>(error: &LibError) -> ApiResponse<T> {
    let status = match error {
        LibError::InvalidCandidates(_) | LibError::UnsupportedOption { .. } => {
            StatusCode::BAD_REQUEST
        }
        LibError::IncompleteResults { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiResponse::failure(ErrorCode::Calculate, status)
}
