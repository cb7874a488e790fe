//! PostgreSQL implementation of ThreadLookup.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::{ThreadLookup, ThreadLookupError};

/// Reads comment threads from the `comment_thread` table.
#[derive(Clone)]
pub struct PostgresThreadLookup {
    pool: PgPool,
}

impl PostgresThreadLookup {
    /// Creates a new PostgresThreadLookup.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThreadLookup for PostgresThreadLookup {
    async fn application_id(&self, thread_id: &str) -> Result<Option<String>, ThreadLookupError> {
        if thread_id.trim().is_empty() {
            return Err(ThreadLookupError::InvalidId(thread_id.to_string()));
        }

        // Only the projected field leaves the database
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT document->>'applicationId' FROM comment_thread WHERE id = $1")
                .bind(thread_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    ThreadLookupError::Database(format!("Failed to fetch thread {}: {}", thread_id, e))
                })?;

        match row {
            None => Ok(None),
            Some((Some(application_id),)) if !application_id.is_empty() => Ok(Some(application_id)),
            Some(_) => Err(ThreadLookupError::MissingApplicationId(thread_id.to_string())),
        }
    }
}
