//! Error types for damage-assess

use std::io;

/// Result type for damage-assess operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while orchestrating a run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing, malformed or contradictory configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input data that cannot be interpreted
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Projection error
    #[error("Projection error: {0}")]
    Projection(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure obtaining cloud credentials
    #[error("Authentication error: {0}")]
    Auth(#[from] gcp_auth::Error),

    /// A remote service answered with an error
    #[error("{service} error ({status}): {message}")]
    Service {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The example generation engine failed
    #[error("Example generation engine failed: {0}")]
    Engine(String),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Returns true for errors caused by the run's configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
