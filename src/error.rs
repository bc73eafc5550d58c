//! Error types for workflow execution.

use thiserror::Error;

/// The main error type for workflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A structural configuration problem (missing identity, bad step wiring).
    ///
    /// Distinct from per-item failures, which are reported as data through
    /// the progress stream and never surface as errors.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A step failed and the run aborted; carries the failing step's name.
    #[error("Step '{step_name}' failed: {message}")]
    Step {
        /// Name of the step that failed.
        step_name: String,
        /// Description of the failure.
        message: String,
    },

    /// An error occurred during execution outside any particular step.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for workflow operations.
pub type Result<T> = std::result::Result<T, Error>;
