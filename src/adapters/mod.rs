//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Identity resolution against the session service
//! - `memory` - In-memory change feed, thread lookup and delivery recorder
//! - `postgres` - LISTEN/NOTIFY change feed and thread projection
//! - `websocket` - Gateway, room registry, presence and pointer relay

pub mod auth;
pub mod memory;
pub mod postgres;
pub mod websocket;
