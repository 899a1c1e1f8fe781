//! Error types for namespaced store operations.
//!
//! The store never raises a "not found" error: a missing key is reported as
//! `None` in the result. Only two things can go wrong:
//!
//! - construction was given an unusable configuration, or
//! - the backend failed while serving an operation.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed backend failure, preserved as the error source.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Store errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Construction parameters are missing or invalid. No store is produced.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend failed during an operation. Never retried by the store.
    #[error("backend unavailable during {operation}: {source}")]
    BackendUnavailable {
        operation: &'static str,
        #[source]
        source: BackendError,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Wrap a backend failure for the named operation.
    pub fn backend(operation: &'static str, source: impl Into<BackendError>) -> Self {
        Self::BackendUnavailable {
            operation,
            source: source.into(),
        }
    }

    /// Returns true if this error came from the backend rather than from setup.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}
