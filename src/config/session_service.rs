//! Session service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Session service configuration (identity resolution)
#[derive(Debug, Clone, Deserialize)]
pub struct SessionServiceConfig {
    /// Base URL of the session service
    pub base_url: String,

    /// Path of the identity endpoint
    #[serde(default = "default_identity_path")]
    pub identity_path: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SessionServiceConfig {
    /// Full URL of the identity endpoint
    pub fn identity_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.identity_path)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate session service configuration
    ///
    /// In production, requires HTTPS for the base URL.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("SESSION_SERVICE__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidSessionServiceUrl);
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::SessionServiceMustBeHttps);
        }
        if !self.identity_path.starts_with('/') {
            return Err(ValidationError::InvalidIdentityPath);
        }
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(ValidationError::InvalidSessionTimeout);
        }
        Ok(())
    }
}

impl Default for SessionServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            identity_path: default_identity_path(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_identity_path() -> String {
    "/applications/new".to_string()
}

fn default_timeout() -> u64 {
    10
}
