//! Engine error types
//!
//! `EngineError` is `Clone` because coalesced requests hand the same
//! settled result to every observer through a shared future; transport
//! errors are flattened to strings at the boundary for that reason.

use std::time::Duration;

use thiserror::Error;
use typeahead_http::TransportError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Per-call deadline exceeded
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure before an HTTP response
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status, or a 2xx whose body could
    /// not be parsed (`parse` set)
    #[error("server returned HTTP {status}")]
    Status { status: u16, parse: bool },

    /// Caller-initiated cancellation
    #[error("request aborted")]
    Aborted,

    /// Local persistence failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(d) => EngineError::Timeout(d),
            TransportError::Aborted => EngineError::Aborted,
            TransportError::Status { status, .. } => EngineError::Status {
                status,
                parse: false,
            },
            TransportError::Decode { status, .. } => EngineError::Status {
                status,
                parse: true,
            },
            TransportError::RequestFailed(e) => EngineError::Network(e.to_string()),
            TransportError::InvalidUrl(m) => EngineError::Network(m),
            TransportError::Build(m) => EngineError::Network(m),
        }
    }
}
