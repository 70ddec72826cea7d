//! Transport error types

use std::time::Duration;

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network request failed before an HTTP response arrived
    #[error("network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Per-attempt deadline exceeded
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Caller-initiated cancellation
    #[error("request aborted")]
    Aborted,

    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered 2xx but the body was not the expected JSON
    #[error("HTTP {status} with undecodable body: {message}")]
    Decode { status: u16, message: String },

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Client build error
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl TransportError {
    /// Check if the error is retryable
    ///
    /// Only failures where the server never answered qualify: connection
    /// problems and deadline expiry. A status response of any kind means
    /// the server has answered and is never retried, and an abort is a
    /// caller decision, not a transient fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::RequestFailed(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TransportError::Timeout(_) => true,
            _ => false,
        }
    }
}
