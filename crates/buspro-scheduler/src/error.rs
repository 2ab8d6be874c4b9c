//! Scheduler error types.

/// Why a refresh did not complete.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The consumer no longer exists; the scheduler drops it.
    #[error("Consumer not found: {0}")]
    NotFound(String),

    /// The consumer exists but could not refresh; it stays scheduled.
    #[error("Refresh failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RefreshError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RefreshError::NotFound(_))
    }
}
