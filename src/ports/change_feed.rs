//! ChangeFeed port - continuous change streams per collection.
//!
//! A feed is an unbounded, lazily produced sequence of [`RawChange`] values
//! for one collection. An `Err` item reports a single change that could not
//! be read; the subscription stays open behind it. The stream ending means
//! the underlying subscription is gone and the consumer decides whether to
//! call [`ChangeFeed::watch`] again.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::change::{Collection, RawChange};

/// A live subscription to one collection.
pub type ChangeStream = BoxStream<'static, Result<RawChange, ChangeFeedError>>;

/// Errors raised by change feed implementations.
#[derive(Debug, thiserror::Error)]
pub enum ChangeFeedError {
    /// Datastore communication error
    #[error("Datastore error: {0}")]
    Database(String),

    /// A change notification could not be decoded
    #[error("Undecodable change notification on {channel}: {reason}")]
    Decode { channel: String, reason: String },
}

/// Port for subscribing to collection change streams.
///
/// # Example
///
/// ```ignore
/// let mut changes = feed.watch(Collection::Comment).await?;
/// while let Some(change) = changes.next().await {
///     match change {
///         Ok(raw) => { fan_out.handle(raw).await; }
///         Err(e) => tracing::warn!(error = %e, "Skipping unreadable change"),
///     }
/// }
/// ```
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a new subscription to `collection`.
    ///
    /// Each call yields an independent stream; changes that happen between
    /// two subscriptions are not replayed.
    async fn watch(&self, collection: Collection) -> Result<ChangeStream, ChangeFeedError>;
}
