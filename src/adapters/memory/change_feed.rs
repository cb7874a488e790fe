//! In-memory change feed for testing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::domain::change::{Collection, RawChange};
use crate::ports::{ChangeFeed, ChangeFeedError, ChangeStream};

type Subscriber = mpsc::UnboundedSender<Result<RawChange, ChangeFeedError>>;

#[derive(Default)]
struct FeedState {
    subscribers: HashMap<Collection, Vec<Subscriber>>,
    watch_calls: HashMap<Collection, usize>,
    unavailable: bool,
}

/// In-memory change feed.
///
/// Changes are pushed with [`publish`](Self::publish) and delivered to every
/// open subscription of the change's collection. Subscriptions can be cut
/// with [`end_streams`](Self::end_streams) to simulate a dropped connection.
///
/// # Example
///
/// ```ignore
/// let feed = Arc::new(InMemoryChangeFeed::new());
/// feed.wait_for_watch(Collection::Comment, 1).await;
/// feed.publish(RawChange::new(Collection::Comment, OperationType::Insert, "c1", Some(doc)));
/// ```
#[derive(Default)]
pub struct InMemoryChangeFeed {
    state: Mutex<FeedState>,
}

impl InMemoryChangeFeed {
    /// Creates a new feed with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change to the open subscriptions of its collection.
    ///
    /// Returns the number of subscriptions it reached.
    pub fn publish(&self, change: RawChange) -> usize {
        self.send(change.collection, || Ok(change.clone()))
    }

    /// Push an unreadable change into every open subscription of `collection`.
    pub fn fail(&self, collection: Collection, reason: &str) -> usize {
        self.send(collection, || {
            Err(ChangeFeedError::Decode {
                channel: collection.to_string(),
                reason: reason.to_string(),
            })
        })
    }

    /// Close every open subscription of `collection`.
    pub fn end_streams(&self, collection: Collection) {
        self.lock().subscribers.remove(&collection);
    }

    /// Make later `watch` calls fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// How many times `watch` was called for `collection`.
    pub fn watch_calls(&self, collection: Collection) -> usize {
        self.lock().watch_calls.get(&collection).copied().unwrap_or(0)
    }

    /// Number of subscriptions of `collection` whose stream is still held.
    pub fn open_subscriptions(&self, collection: Collection) -> usize {
        self.lock()
            .subscribers
            .get(&collection)
            .map(|subscribers| subscribers.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Wait until `collection` has been watched at least `calls` times.
    pub async fn wait_for_watch(&self, collection: Collection, calls: usize) {
        while self.watch_calls(collection) < calls {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn send(
        &self,
        collection: Collection,
        item: impl Fn() -> Result<RawChange, ChangeFeedError>,
    ) -> usize {
        let mut state = self.lock();
        let Some(subscribers) = state.subscribers.get_mut(&collection) else {
            return 0;
        };
        subscribers.retain(|subscriber| subscriber.send(item()).is_ok());
        subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChangeFeed for InMemoryChangeFeed {
    async fn watch(&self, collection: Collection) -> Result<ChangeStream, ChangeFeedError> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.lock();
            *state.watch_calls.entry(collection).or_default() += 1;
            if state.unavailable {
                return Err(ChangeFeedError::Database("feed unavailable".to_string()));
            }
            state.subscribers.entry(collection).or_default().push(tx);
        }

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}
