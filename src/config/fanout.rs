//! Change fan-out configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Change feed restart settings
#[derive(Debug, Clone, Deserialize)]
pub struct FanOutConfig {
    /// Consecutive feed reopen attempts per collection
    #[serde(default = "default_max_feed_restarts")]
    pub max_feed_restarts: u32,

    /// Delay before reopening a failed feed, in milliseconds
    #[serde(default = "default_restart_backoff")]
    pub restart_backoff_ms: u64,
}

impl FanOutConfig {
    /// Get restart backoff as Duration
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    /// Validate fan-out configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.restart_backoff_ms == 0 {
            return Err(ValidationError::InvalidRestartBackoff);
        }
        Ok(())
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_feed_restarts: default_max_feed_restarts(),
            restart_backoff_ms: default_restart_backoff(),
        }
    }
}

fn default_max_feed_restarts() -> u32 {
    5
}

fn default_restart_backoff() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fanout_defaults() {
        let config = FanOutConfig::default();
        assert_eq!(config.max_feed_restarts, 5);
        assert_eq!(config.restart_backoff(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_backoff_rejected() {
        let config = FanOutConfig {
            restart_backoff_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRestartBackoff));
    }
}
