use thiserror::Error;

/// Convenient result alias for the geodist library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when the result channel closed before every dispatched unit of
    /// work reported its distance.
    #[error("fan-out collected {received} of {expected} distance results")]
    IncompleteResults { expected: usize, received: usize },

    /// Raised when a candidate list could not be decoded from JSON.
    #[error("failed to decode candidate list: {0}")]
    InvalidCandidates(#[from] serde_json::Error),

    /// Raised when a fan-out option is given a value it does not understand.
    #[error("unsupported {option} value: {value}")]
    UnsupportedOption { option: &'static str, value: String },
}
