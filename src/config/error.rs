//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Outbox capacity must be greater than zero")]
    InvalidOutboxCapacity,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 4 and 100 (one listener per watched collection plus queries)")]
    InvalidPoolSize,

    #[error("Invalid session service URL format")]
    InvalidSessionServiceUrl,

    #[error("Session service must use HTTPS in production")]
    SessionServiceMustBeHttps,

    #[error("Identity path must start with '/'")]
    InvalidIdentityPath,

    #[error("Session service timeout must be between 1 and 60 seconds")]
    InvalidSessionTimeout,

    #[error("Feed restart backoff must be greater than zero")]
    InvalidRestartBackoff,
}
