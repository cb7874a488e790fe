//! Identity resolution adapters.
//!
//! Implementations of the `IdentityResolver` port:
//!
//! - `session_service` - Production resolver calling the session service
//! - `mock` - Test implementation that doesn't require external services

mod mock;
mod session_service;

pub use mock::MockIdentityResolver;
pub use session_service::SessionServiceResolver;
