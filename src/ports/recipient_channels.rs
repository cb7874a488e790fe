//! RecipientChannels port - delivery to private per-identity channels.
//!
//! Every authenticated root-namespace connection listens on the private
//! channel of its identity's email. The fan-out engine addresses those
//! channels by email and never sees individual connections.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::change::ChangeNotice;

/// Delivers change notices to whoever is online for a set of emails.
#[async_trait]
pub trait RecipientChannels: Send + Sync {
    /// Emit `notice` once to the union of the recipients' channels.
    ///
    /// Membership is read at call time. Recipients with no live connection
    /// are skipped silently; nothing is queued for them.
    ///
    /// Returns the number of connections the notice was handed to.
    async fn deliver(&self, recipients: &HashSet<String>, notice: ChangeNotice) -> usize;
}
