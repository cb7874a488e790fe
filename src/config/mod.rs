//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `COLLAB_RTS` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use collab_rts::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod fanout;
mod server;
mod session_service;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use fanout::FanOutConfig;
pub use server::{Environment, ServerConfig};
pub use session_service::SessionServiceConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, environment, connection limits)
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store holding comments, threads and notifications
    pub database: DatabaseConfig,

    /// Session service used to resolve connection identities
    pub session_service: SessionServiceConfig,

    /// Change feed restart settings
    #[serde(default)]
    pub fanout: FanOutConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `COLLAB_RTS__SERVER__PORT=8091` -> `server.port = 8091`
    /// - `COLLAB_RTS__DATABASE__URL=...` -> `database.url = ...`
    /// - `COLLAB_RTS__SESSION_SERVICE__BASE_URL=...` -> `session_service.base_url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a value
    /// cannot be parsed into its expected type.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COLLAB_RTS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.session_service.validate(&self.server.environment)?;
        self.fanout.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
