//! Mock identity resolver for testing.
//!
//! Implements the `IdentityResolver` port without a session service.
//!
//! # Example
//!
//! ```ignore
//! use collab_rts::adapters::auth::MockIdentityResolver;
//! use collab_rts::domain::identity::Identity;
//!
//! let resolver = MockIdentityResolver::new()
//!     .with_session("valid-cookie", Identity::new("test@example.com", None));
//!
//! let identity = resolver.resolve(Some(&credential)).await?;
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::identity::{AuthError, Identity, SessionCredential, SESSION_COOKIE};
use crate::ports::IdentityResolver;

#[derive(Debug, Default)]
struct MockState {
    sessions: HashMap<String, Identity>,
    force_error: Option<AuthError>,
    delay: Option<Duration>,
    calls: usize,
}

/// Mock identity resolver for testing.
///
/// Maps session cookie values to identities. Unknown sessions return
/// `InvalidSession`.
#[derive(Debug, Default)]
pub struct MockIdentityResolver {
    state: Mutex<MockState>,
}

impl MockIdentityResolver {
    /// Creates a new empty mock resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid session that maps to an identity.
    pub fn with_session(self, session: impl Into<String>, identity: Identity) -> Self {
        self.lock().sessions.insert(session.into(), identity);
        self
    }

    /// Forces all resolutions to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        self.lock().force_error = Some(error);
        self
    }

    /// Delays every resolution, simulating a slow session service.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Clears the forced error and returns to normal operation.
    pub fn clear_error(&self) {
        self.lock().force_error = None;
    }

    /// Number of resolutions attempted with a credential.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityResolver for MockIdentityResolver {
    async fn resolve(&self, credential: Option<&SessionCredential>) -> Result<Identity, AuthError> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;

        let delay = {
            let mut state = self.lock();
            state.calls += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if let Some(error) = state.force_error.clone() {
            return Err(error);
        }

        let cookie = credential.cookie_header();
        let session = cookie
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .unwrap_or_default();

        state
            .sessions
            .get(session)
            .cloned()
            .ok_or(AuthError::InvalidSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_session_resolves() {
        let resolver =
            MockIdentityResolver::new().with_session("abc", Identity::new("a@x.com", None));

        let identity = resolver
            .resolve(Some(&SessionCredential::new("abc")))
            .await
            .unwrap();

        assert_eq!(identity.email, "a@x.com");
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_session_is_invalid() {
        let resolver = MockIdentityResolver::new();

        let result = resolver.resolve(Some(&SessionCredential::new("nope"))).await;

        assert!(matches!(result, Err(AuthError::InvalidSession)));
    }

    #[tokio::test]
    async fn missing_credential_is_not_counted() {
        let resolver = MockIdentityResolver::new();

        let result = resolver.resolve(None).await;

        assert!(matches!(result, Err(AuthError::MissingCredential)));
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn forced_error_is_returned_until_cleared() {
        let resolver = MockIdentityResolver::new()
            .with_session("abc", Identity::new("a@x.com", None))
            .with_error(AuthError::service_unavailable("down"));
        let credential = SessionCredential::new("abc");

        assert!(resolver.resolve(Some(&credential)).await.is_err());
        resolver.clear_error();
        assert!(resolver.resolve(Some(&credential)).await.is_ok());
    }
}
