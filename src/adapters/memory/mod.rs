//! In-memory adapters for testing.
//!
//! Deterministic stand-ins for the datastore and delivery ports, so the
//! fan-out engine can be exercised without PostgreSQL or sockets.

mod change_feed;
mod recipient_channels;
mod thread_lookup;

pub use change_feed::InMemoryChangeFeed;
pub use recipient_channels::{Delivery, RecordingChannels};
pub use thread_lookup::InMemoryThreadLookup;
