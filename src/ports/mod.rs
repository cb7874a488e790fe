//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Ports
//!
//! - `IdentityResolver` - Resolves a session credential to an identity
//! - `RecipientChannels` - Delivers a change notice to identity channels
//!
//! ## Change Source Ports
//!
//! - `ChangeFeed` - Per-collection stream of document changes
//! - `ThreadLookup` - Parent thread projection for comment changes

mod change_feed;
mod identity_resolver;
mod recipient_channels;
mod thread_lookup;

pub use change_feed::{ChangeFeed, ChangeFeedError, ChangeStream};
pub use identity_resolver::IdentityResolver;
pub use recipient_channels::RecipientChannels;
pub use thread_lookup::{ThreadLookup, ThreadLookupError};
