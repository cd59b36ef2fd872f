//! Worker configuration
//!
//! Defines the two timing parameters of the worker: how often it checks
//! whether it is free, and how long one cycle may take before the worker
//! gives up on it and goes idle anyway.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConstructionError;

/// Default polling period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Default maximum duration of one cycle
pub const DEFAULT_PATIENCE: Duration = Duration::from_millis(5000);

/// Resolved worker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How often the heartbeat fires
    pub heartbeat_interval: Duration,

    /// Maximum time allowed for one cycle before forced idle
    pub patience: Duration,
}

/// Partial configuration, merged over the defaults
///
/// Every field is optional; anything left out keeps its default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerOptions {
    /// Polling period in milliseconds
    pub heartbeat_interval_ms: Option<u64>,

    /// Maximum cycle duration in milliseconds
    pub patience_ms: Option<u64>,
}

impl WorkerOptions {
    /// Parses options from a JSON document such as `{"patience_ms": 50}`
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from environment variables
    ///
    /// Recognised variables:
    /// - HONEYDEW_HEARTBEAT_INTERVAL_MS (optional, default: 100)
    /// - HONEYDEW_PATIENCE_MS (optional, default: 5000)
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            heartbeat_interval_ms: env_millis("HONEYDEW_HEARTBEAT_INTERVAL_MS")?,
            patience_ms: env_millis("HONEYDEW_PATIENCE_MS")?,
        })
    }

    /// Sets the polling period
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = Some(duration_millis(interval));
        self
    }

    /// Sets the maximum cycle duration
    pub fn with_patience(mut self, patience: Duration) -> Self {
        self.patience_ms = Some(duration_millis(patience));
        self
    }
}

impl WorkerConfig {
    /// Creates a configuration from explicit values
    pub fn new(heartbeat_interval: Duration, patience: Duration) -> Self {
        Self {
            heartbeat_interval,
            patience,
        }
    }

    /// Returns this configuration with any options that are set applied on top
    pub fn merged(self, options: WorkerOptions) -> Self {
        Self {
            heartbeat_interval: options
                .heartbeat_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(self.heartbeat_interval),
            patience: options
                .patience_ms
                .map(Duration::from_millis)
                .unwrap_or(self.patience),
        }
    }

    /// Validates the configuration
    ///
    /// Both durations must be non-zero. Patience is not checked against the
    /// heartbeat interval.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ConstructionError::InvalidConfig(
                "heartbeat_interval must be greater than 0".to_string(),
            ));
        }

        if self.patience.is_zero() {
            return Err(ConstructionError::InvalidConfig(
                "patience must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_PATIENCE)
    }
}

impl From<WorkerOptions> for WorkerConfig {
    fn from(options: WorkerOptions) -> Self {
        Self::default().merged(options)
    }
}

fn env_millis(name: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} must be a whole number of milliseconds: {}", name, e)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("{} is not valid unicode: {}", name, e)),
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(100));
        assert_eq!(config.patience, Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_unset_defaults() {
        let options = WorkerOptions {
            heartbeat_interval_ms: None,
            patience_ms: Some(50),
        };
        let config = WorkerConfig::from(options);

        assert_eq!(config.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(config.patience, Duration::from_millis(50));
    }

    #[test]
    fn test_builder_style_options() {
        let options = WorkerOptions::default()
            .with_heartbeat_interval(Duration::from_millis(20))
            .with_patience(Duration::from_secs(1));

        assert_eq!(options.heartbeat_interval_ms, Some(20));
        assert_eq!(options.patience_ms, Some(1000));
    }

    #[test]
    fn test_options_from_json() {
        let options = WorkerOptions::from_json(r#"{"patience_ms": 50}"#).unwrap();
        assert_eq!(options.patience_ms, Some(50));
        assert_eq!(options.heartbeat_interval_ms, None);

        let empty = WorkerOptions::from_json("{}").unwrap();
        assert_eq!(empty, WorkerOptions::default());

        assert!(WorkerOptions::from_json(r#"{"heartRate": 10}"#).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WorkerConfig::default();
        assert!(config.validate().is_ok());

        config.heartbeat_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConstructionError::InvalidConfig(_))
        ));

        config.heartbeat_interval = Duration::from_millis(100);
        config.patience = Duration::ZERO;
        assert!(config.validate().is_err());

        // Patience longer than the interval is allowed
        config.patience = Duration::from_secs(60);
        assert!(config.validate().is_ok());
    }
}
