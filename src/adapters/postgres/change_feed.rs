//! PostgreSQL implementation of ChangeFeed.
//!
//! Each watched collection is a table of JSONB documents whose row trigger
//! publishes `{"operationType": ..., "id": ...}` on a per-collection
//! channel (see `migrations/`). The feed `LISTEN`s on that channel and
//! looks up the current document for every notification, redacting the
//! collection's internal fields in the query itself.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::domain::change::{Collection, Document, OperationType, RawChange};
use crate::ports::{ChangeFeed, ChangeFeedError, ChangeStream};

/// Table backing a collection.
pub fn table_name(collection: Collection) -> &'static str {
    match collection {
        Collection::Comment => "comment",
        Collection::CommentThread => "comment_thread",
        Collection::Notification => "notification",
    }
}

/// Notification channel a collection's trigger publishes on.
pub fn channel_name(collection: Collection) -> String {
    format!("{}_changes", table_name(collection))
}

/// Payload published by the change trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "operationType")]
    pub operation: OperationType,
    pub id: String,
}

/// Parse a trigger payload received on `channel`.
pub fn decode_notification(channel: &str, payload: &str) -> Result<ChangeNotification, ChangeFeedError> {
    let notification: ChangeNotification =
        serde_json::from_str(payload).map_err(|e| ChangeFeedError::Decode {
            channel: channel.to_string(),
            reason: e.to_string(),
        })?;

    if notification.id.is_empty() {
        return Err(ChangeFeedError::Decode {
            channel: channel.to_string(),
            reason: "empty id".to_string(),
        });
    }
    Ok(notification)
}

/// PostgreSQL implementation of ChangeFeed.
#[derive(Clone)]
pub struct PostgresChangeFeed {
    pool: PgPool,
}

impl PostgresChangeFeed {
    /// Creates a new PostgresChangeFeed.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeFeed for PostgresChangeFeed {
    async fn watch(&self, collection: Collection) -> Result<ChangeStream, ChangeFeedError> {
        let channel = channel_name(collection);

        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| ChangeFeedError::Database(format!("Failed to open listener: {}", e)))?;
        listener
            .listen(&channel)
            .await
            .map_err(|e| ChangeFeedError::Database(format!("Failed to LISTEN on {}: {}", channel, e)))?;

        tracing::info!(collection = %collection, channel = %channel, "Change feed subscribed");

        // A listener error ends the subscription; a notification that cannot
        // be turned into a change is reported as one error item.
        let pool = self.pool.clone();
        let stream = listener
            .into_stream()
            .take_while(move |received| {
                if let Err(e) = received {
                    tracing::warn!(collection = %collection, error = %e, "Change listener failed");
                }
                futures::future::ready(received.is_ok())
            })
            .filter_map(move |received| {
                let pool = pool.clone();
                async move {
                    let received = received.ok()?;
                    Some(read_change(&pool, collection, received.channel(), received.payload()).await)
                }
            });

        Ok(stream.boxed())
    }
}

/// Turn one trigger notification into a change.
async fn read_change(
    pool: &PgPool,
    collection: Collection,
    channel: &str,
    payload: &str,
) -> Result<RawChange, ChangeFeedError> {
    let notification = decode_notification(channel, payload)?;

    let full_document = match notification.operation {
        OperationType::Delete => None,
        _ => fetch_document(pool, collection, &notification.id).await?,
    };

    Ok(RawChange::new(
        collection,
        notification.operation,
        notification.id,
        full_document,
    ))
}

/// Current document for `id`, without the collection's internal fields.
///
/// `None` when the row is gone by the time we look.
async fn fetch_document(
    pool: &PgPool,
    collection: Collection,
    id: &str,
) -> Result<Option<Document>, ChangeFeedError> {
    let redacted: Vec<String> = collection
        .internal_fields()
        .iter()
        .map(|field| field.to_string())
        .collect();
    let sql = format!(
        "SELECT document - $2::text[] FROM {} WHERE id = $1",
        table_name(collection)
    );

    let row: Option<(Value,)> = sqlx::query_as(&sql)
        .bind(id)
        .bind(redacted)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            ChangeFeedError::Database(format!("Failed to fetch {} {}: {}", collection, id, e))
        })?;

    Ok(row.and_then(|(document,)| with_id(document, id)))
}

/// Ensures the emitted document carries its id as `_id`.
fn with_id(document: Value, id: &str) -> Option<Document> {
    match document {
        Value::Object(mut map) => {
            map.entry("_id")
                .or_insert_with(|| Value::String(id.to_string()));
            Some(map)
        }
        _ => None,
    }
}
