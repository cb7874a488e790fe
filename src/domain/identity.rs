//! Identity types for connected editors.
//!
//! An [`Identity`] is what the session service tells us about the person
//! behind a connection. It is resolved once per connection, after the
//! WebSocket upgrade, and never persisted by this process.
//!
//! The session credential itself is wrapped in [`SessionCredential`] so the
//! cookie value cannot leak into logs through `Debug`.

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the cookie carrying the editor session.
pub const SESSION_COOKIE: &str = "SESSION";

/// A verified editor identity. Unique by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name shown next to cursors and in presence lists.
    #[serde(rename = "name")]
    pub display_name: String,

    /// Email address; the key for presence de-duplication and private channels.
    pub email: String,
}

impl Identity {
    /// Creates an identity, falling back to the email when no usable
    /// display name is available.
    pub fn new(email: impl Into<String>, display_name: Option<String>) -> Self {
        let email = email.into();
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        Self {
            display_name,
            email,
        }
    }
}

/// The session credential presented during the WebSocket handshake.
pub struct SessionCredential(Secret<String>);

impl SessionCredential {
    /// Wraps a raw session cookie value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    /// Extracts the `SESSION` cookie from a `Cookie` header value.
    ///
    /// Returns `None` when the header carries no non-empty session cookie.
    pub fn from_cookie_header(header: &str) -> Option<Self> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| Self::new(value))
    }

    /// The `Cookie` header value to forward to the session service.
    ///
    /// Only the session cookie is forwarded, never the rest of the jar.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.0.expose_secret())
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential([REDACTED])")
    }
}

/// Reasons an identity could not be resolved.
///
/// None of these are process errors: every variant leaves the connection
/// open but unauthenticated.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The handshake carried no session cookie; no network call was made.
    #[error("No session credential presented")]
    MissingCredential,

    /// The session service rejected the credential (HTTP 401).
    #[error("Session rejected by session service")]
    InvalidSession,

    /// The session service was unreachable, timed out, or answered non-2xx.
    #[error("Session service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The session service answered 2xx with a body we could not read.
    #[error("Malformed session service response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
