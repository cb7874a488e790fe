//! Collab RTS - Real-time collaboration server
//!
//! Maintains per-resource editor presence, relays live pointer positions
//! between co-editors and pushes authorized change notices for comments,
//! comment threads and notifications to the sockets of the users allowed
//! to see them.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod server;
