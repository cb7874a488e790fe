//! Application layer - Orchestration between ports.
//!
//! The fan-out engine coordinates the change feed, the thread lookup and
//! the recipient channels; it owns no state of its own.

pub mod fanout;

pub use fanout::{ChangeFanOut, DropReason, FanOutOutcome, FeedExit, RestartPolicy};
