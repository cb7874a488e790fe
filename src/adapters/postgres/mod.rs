//! PostgreSQL adapters - Database implementations for the change-source ports.
//!
//! This module provides adapters for the PostgreSQL document store:
//! - `PostgresChangeFeed` - LISTEN/NOTIFY change streams per collection
//! - `PostgresThreadLookup` - Parent thread projection for comment events

mod change_feed;
mod thread_lookup;

pub use change_feed::{
    channel_name, decode_notification, table_name, ChangeNotification, PostgresChangeFeed,
};
pub use thread_lookup::PostgresThreadLookup;
