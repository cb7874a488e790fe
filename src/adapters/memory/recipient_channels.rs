//! Recording recipient channels for testing.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::change::ChangeNotice;
use crate::ports::RecipientChannels;

/// One call to [`RecipientChannels::deliver`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipients: HashSet<String>,
    pub notice: ChangeNotice,
}

/// Captures deliveries instead of sending them.
///
/// Every recipient counts as one online connection.
#[derive(Debug, Default)]
pub struct RecordingChannels {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all deliveries (for test assertions).
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    /// Returns count of deliveries.
    pub fn delivery_count(&self) -> usize {
        self.lock().len()
    }

    /// Notices addressed to `email`, in delivery order.
    pub fn received_by(&self, email: &str) -> Vec<ChangeNotice> {
        self.lock()
            .iter()
            .filter(|delivery| delivery.recipients.contains(email))
            .map(|delivery| delivery.notice.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecipientChannels for RecordingChannels {
    async fn deliver(&self, recipients: &HashSet<String>, notice: ChangeNotice) -> usize {
        self.lock().push(Delivery {
            recipients: recipients.clone(),
            notice,
        });
        recipients.len()
    }
}
