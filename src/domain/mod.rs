//! Domain layer containing collaboration types and pure rules.
//!
//! - `identity` - Authenticated user identity and session credentials
//! - `room` - Namespaces, room names and connection lifecycle
//! - `policy` - First-match policy resolution for change recipients
//! - `change` - Datastore change events and their redaction

pub mod change;
pub mod identity;
pub mod policy;
pub mod room;
