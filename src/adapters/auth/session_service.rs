//! Session service adapter for identity resolution.
//!
//! Implements the `IdentityResolver` port by forwarding the editor's
//! session cookie to the session service and reading back the user it
//! belongs to:
//!
//! ```text
//! GET {base_url}{identity_path}
//! Cookie: SESSION=<value>
//!
//! 200 {"data": {"user": {"email": "...", "name": "..."}}}
//! ```
//!
//! Any status other than 2xx leaves the connection unauthenticated. A 401
//! is an ordinary rejected session; everything else means the service is
//! not answering properly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::config::SessionServiceConfig;
use crate::domain::identity::{AuthError, Identity, SessionCredential};
use crate::ports::IdentityResolver;

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    data: IdentityData,
}

#[derive(Debug, Deserialize)]
struct IdentityData {
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

/// Resolves identities through the session service's HTTP API.
pub struct SessionServiceResolver {
    identity_url: String,
    http_client: reqwest::Client,
}

impl SessionServiceResolver {
    /// Create a resolver for `identity_url` with a per-request timeout.
    pub fn new(identity_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            identity_url: identity_url.into(),
            http_client,
        })
    }

    /// Create a resolver from validated configuration.
    pub fn from_config(config: &SessionServiceConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.identity_url(), config.timeout())
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }
}

#[async_trait]
impl IdentityResolver for SessionServiceResolver {
    async fn resolve(&self, credential: Option<&SessionCredential>) -> Result<Identity, AuthError> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;

        let response = self
            .http_client
            .get(&self.identity_url)
            .header(header::COOKIE, credential.cookie_header())
            .send()
            .await
            .map_err(|e| AuthError::service_unavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidSession);
        }
        if !status.is_success() {
            return Err(AuthError::service_unavailable(format!(
                "Session service returned {}",
                status
            )));
        }

        let envelope: IdentityEnvelope = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let user = envelope.data.user;

        if user.email.trim().is_empty() {
            return Err(AuthError::MalformedResponse("empty email".to_string()));
        }

        tracing::debug!(email = %user.email, "Session resolved");
        Ok(Identity::new(user.email, user.name))
    }
}

impl std::fmt::Debug for SessionServiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServiceResolver")
            .field("identity_url", &self.identity_url)
            .finish_non_exhaustive()
    }
}
