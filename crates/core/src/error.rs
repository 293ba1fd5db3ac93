//! Error types for the optflow system.
//!
//! Data-quality problems in flow rows are never errors; they are coerced away
//! at read time. What remains here are boundary and configuration failures.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the optflow system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid weights, cutoffs, cascades, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Contract violation at the boundary (e.g. an unparseable reference date).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}
