//! Change fan-out engine.
//!
//! Watches the comment, comment thread and notification collections and
//! pushes every change to the private channels of the identities entitled
//! to see it:
//!
//! | Collection | Audience | Enrichment |
//! |------------|----------|------------|
//! | comment | first `read:comments` policy | parent thread's `applicationId` |
//! | commentThread | first `read:commentThreads` policy | `isViewed = false` |
//! | notification | `forUsername` | `type` from `_class` |
//!
//! Audiences are computed from the changed document at emit time and never
//! cached. A change that cannot be processed is logged and dropped; the
//! engine keeps running.
//!
//! ## Feed restarts
//!
//! A change the feed cannot read is skipped and the subscription kept.
//! When a collection's feed ends or cannot be opened, the subscription is
//! reopened after `RestartPolicy::backoff`. After `max_restarts` consecutive
//! failures without a single successful change, that collection is given
//! up on.
//!
//! ## Graceful Shutdown
//!
//! [`ChangeFanOut::run`] stops all feed tasks when the shutdown watch flips
//! to `true` and returns once each has dropped its subscription.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::change::{ChangeEvent, Collection, NormalizeError, RawChange};
use crate::domain::policy::{resolve_recipients, READ_COMMENTS, READ_COMMENT_THREADS};
use crate::ports::{ChangeFeed, RecipientChannels, ThreadLookup, ThreadLookupError};

/// How often and how fast a failed feed is reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Consecutive reopen attempts before giving up.
    pub max_restarts: u32,

    /// Delay before each reopen.
    pub backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RestartPolicy {
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Why a change was not delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Parent thread lookup failed: {0}")]
    ThreadLookup(String),

    #[error("Parent thread {0} not found")]
    ThreadNotFound(String),

    #[error("Parent thread {0} has no applicationId")]
    ThreadWithoutApplication(String),
}

impl From<ThreadLookupError> for DropReason {
    fn from(err: ThreadLookupError) -> Self {
        match err {
            ThreadLookupError::MissingApplicationId(thread_id) => {
                DropReason::ThreadWithoutApplication(thread_id)
            }
            other => DropReason::ThreadLookup(other.to_string()),
        }
    }
}

/// What happened to one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutOutcome {
    /// Handed to the recipients' channels.
    Delivered { event: String, connections: usize },

    /// Nobody is entitled to see it.
    Suppressed { event: String },

    /// The change could not be processed.
    Dropped(DropReason),
}

/// How a collection's feed task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedExit {
    Shutdown,
    /// The restart budget ran out.
    Exhausted,
}

/// Fans datastore changes out to identity channels.
pub struct ChangeFanOut {
    feed: Arc<dyn ChangeFeed>,
    threads: Arc<dyn ThreadLookup>,
    channels: Arc<dyn RecipientChannels>,
    restart: RestartPolicy,
}

impl ChangeFanOut {
    /// Create an engine with the default restart policy.
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        threads: Arc<dyn ThreadLookup>,
        channels: Arc<dyn RecipientChannels>,
    ) -> Self {
        Self::with_restart_policy(feed, threads, channels, RestartPolicy::default())
    }

    /// Create an engine with a custom restart policy.
    pub fn with_restart_policy(
        feed: Arc<dyn ChangeFeed>,
        threads: Arc<dyn ThreadLookup>,
        channels: Arc<dyn RecipientChannels>,
        restart: RestartPolicy,
    ) -> Self {
        Self {
            feed,
            threads,
            channels,
            restart,
        }
    }

    /// Watch every collection until shutdown.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let tasks: Vec<_> = Collection::ALL
            .into_iter()
            .map(|collection| {
                let engine = Arc::clone(&self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { engine.watch_collection(collection, shutdown).await })
            })
            .collect();

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("Change feed task failed: {}", e);
            }
        }
        tracing::info!("Change fan-out stopped");
    }

    /// Consume one collection's feed, reopening it per the restart policy.
    pub async fn watch_collection(
        &self,
        collection: Collection,
        mut shutdown: watch::Receiver<bool>,
    ) -> FeedExit {
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return FeedExit::Shutdown;
            }

            match self.feed.watch(collection).await {
                Ok(mut changes) => loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                tracing::debug!(collection = %collection, "Change feed closing");
                                return FeedExit::Shutdown;
                            }
                        }
                        next = changes.next() => match next {
                            Some(Ok(raw)) => {
                                failures = 0;
                                self.handle(raw).await;
                            }
                            Some(Err(e)) => {
                                tracing::warn!(
                                    collection = %collection,
                                    error = %e,
                                    "Skipping unreadable change"
                                );
                            }
                            None => {
                                tracing::warn!(collection = %collection, "Change feed ended");
                                break;
                            }
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "Failed to open change feed");
                }
            }

            if failures >= self.restart.max_restarts {
                tracing::error!(
                    collection = %collection,
                    attempts = failures,
                    "Change feed restarts exhausted, no longer watching"
                );
                return FeedExit::Exhausted;
            }
            failures += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.restart.backoff) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return FeedExit::Shutdown;
                    }
                }
            }
            tracing::info!(collection = %collection, attempt = failures, "Reopening change feed");
        }
    }

    /// Process a single change.
    ///
    /// Never fails: undeliverable changes are logged and reported as
    /// [`FanOutOutcome::Dropped`].
    pub async fn handle(&self, raw: RawChange) -> FanOutOutcome {
        let collection = raw.collection;
        let document_id = raw.document_id.clone();

        match self.route(raw).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                tracing::warn!(
                    collection = %collection,
                    document_id = %document_id,
                    reason = %reason,
                    "Dropping change"
                );
                FanOutOutcome::Dropped(reason)
            }
        }
    }

    async fn route(&self, raw: RawChange) -> Result<FanOutOutcome, DropReason> {
        let event = ChangeEvent::normalize(raw)?;

        match event.collection {
            Collection::Comment => {
                let thread_id = event.thread_id()?.to_string();
                let application_id = self
                    .threads
                    .application_id(&thread_id)
                    .await?
                    .ok_or(DropReason::ThreadNotFound(thread_id))?;

                let recipients = resolve_recipients(&event.policies(), READ_COMMENTS);
                Ok(self.emit(recipients, event.prepare_comment(application_id)).await)
            }
            Collection::CommentThread => {
                let recipients = resolve_recipients(&event.policies(), READ_COMMENT_THREADS);
                Ok(self.emit(recipients, event.prepare_thread()).await)
            }
            Collection::Notification => {
                let (owner, event) = event.prepare_notification()?;
                Ok(self.emit(HashSet::from([owner]), event).await)
            }
        }
    }

    async fn emit(&self, recipients: HashSet<String>, event: ChangeEvent) -> FanOutOutcome {
        let name = event.event_name.clone();

        if recipients.is_empty() {
            tracing::debug!(event = %name, document_id = %event.document_id, "No authorized recipients");
            return FanOutOutcome::Suppressed { event: name };
        }

        let connections = self.channels.deliver(&recipients, event.into_notice()).await;
        tracing::debug!(
            event = %name,
            recipients = recipients.len(),
            connections,
            "Change fanned out"
        );
        FanOutOutcome::Delivered {
            event: name,
            connections,
        }
    }
}
