//! Error types for tokenlens-analytics

use thiserror::Error;

/// Analytics error type.
///
/// Unlike the instrumentation path, the analytics read path is an
/// explicit query operation and store failures surface to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Event store failure
    #[error("store error: {0}")]
    Store(String),

    /// Invalid query parameters
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
