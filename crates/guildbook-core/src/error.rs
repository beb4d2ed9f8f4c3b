//! Error types for directory operations.
//!
//! Every failure the directory layer can produce is a member of [`Error`].
//! Callers must be able to distinguish "record not found", "credentials
//! rejected", and "directory unreachable" without string matching, so each
//! condition has its own variant and stable error code.

use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The directory server could not be reached
    #[error("Directory unreachable: {0}")]
    Connect(String),

    /// The bind credentials were rejected by the directory
    #[error("Bind rejected: {0}")]
    Bind(String),

    /// The search matched no entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// The directory rejected a search or modify operation
    #[error("Directory operation failed: {operation}: {message}")]
    Operation {
        /// Operation that failed (e.g. `search`, `modify`)
        operation: String,
        /// Server-provided detail
        message: String,
    },

    /// Connecting or an operation exceeded its time bound
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid static configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the stable error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "DIRECTORY_UNREACHABLE",
            Self::Bind(_) => "BIND_REJECTED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Operation { .. } => "OPERATION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Not-found lookups and rejected credentials are expected request
    /// outcomes; unreachable or misconfigured infrastructure is not.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Timeout(_) | Self::Config(_)
        )
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}
