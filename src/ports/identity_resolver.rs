//! Identity resolution port.
//!
//! Exchanges the session credential presented at handshake time for a
//! verified [`Identity`]. Implementations exist for the HTTP session service
//! and for tests.
//!
//! # Contract
//!
//! Implementations must:
//! - return `AuthError::MissingCredential` for `None` without any I/O
//! - return `AuthError::InvalidSession` when the service rejects the session
//! - return `AuthError::ServiceUnavailable` for transport errors, timeouts
//!   and unexpected statuses
//! - never panic; every error means "unauthenticated" to the caller

use async_trait::async_trait;

use crate::domain::identity::{AuthError, Identity, SessionCredential};

/// Resolves session credentials to identities.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the identity behind a session credential.
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - The session is valid
    /// * `Err(AuthError)` - The connection stays unauthenticated
    async fn resolve(&self, credential: Option<&SessionCredential>) -> Result<Identity, AuthError>;
}
