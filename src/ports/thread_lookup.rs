//! ThreadLookup port - parent thread resolution for comment events.

use async_trait::async_trait;

/// Errors that can occur while looking up a thread.
#[derive(Debug, thiserror::Error)]
pub enum ThreadLookupError {
    #[error("Datastore error: {0}")]
    Database(String),

    #[error("Invalid thread id: {0}")]
    InvalidId(String),

    /// The thread exists but carries no `applicationId`.
    #[error("Thread {0} has no applicationId")]
    MissingApplicationId(String),
}

/// Reads the fields of a comment thread the fan-out engine needs.
#[async_trait]
pub trait ThreadLookup: Send + Sync {
    /// The `applicationId` of thread `thread_id`.
    ///
    /// Returns `Ok(None)` when the thread does not exist and
    /// [`ThreadLookupError::MissingApplicationId`] when it exists without one.
    async fn application_id(&self, thread_id: &str) -> Result<Option<String>, ThreadLookupError>;
}
