//! Error types for the benchmark engine.
//!
//! Errors fall into two groups:
//! - Backend failures (`Backend`, `InvalidPageState`) are reported by a
//!   [`StorageBackend`] while a run is in progress. Coordinators log them and
//!   count them as failures. They never stop the worker pool and are never
//!   retried.
//! - Configuration failures (`InvalidConfig`) are raised before any worker
//!   starts and are fatal to the run.
//!
//! [`StorageBackend`]: crate::StorageBackend

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the benchmark engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A write or lookup against the storage backend failed.
    #[error("Backend error: {context}")]
    Backend { context: String },

    /// The backend could not resume a paginated lookup from the given token.
    #[error("Invalid page state: {context}")]
    InvalidPageState { context: String },

    /// The hierarchy or run configuration violates a precondition.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    pub fn backend(context: impl Into<String>) -> Self {
        Self::Backend {
            context: context.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
