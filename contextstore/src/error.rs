//! Error types for the context store.

use thiserror::Error;

/// Errors raised by [`crate::manager::ContextManager`] operations.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("cannot remove or summarize a critical-priority item: {0}")]
    CriticalItemProtected(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ContextError {
    /// Persistence errors are non-fatal per spec.md §7: the caller may continue
    /// in memory and retry the write on the next successful operation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ContextError::Persistence(_))
    }
}
