//! Configuration for the cluster index and the document-facing collection.
//!
//! Every field has a serde default so partial JSON/TOML documents load cleanly.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest geohash the encoder supports.
pub const MAX_GEOHASH_PRECISION: usize = 12;

/// What a walk does once a level has exhausted its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failed level and keep walking the remaining levels
    Continue,
    /// Stop the walk; remaining levels are skipped, committed ones stay
    Abort,
    /// Stop the walk and compensate every level committed so far
    #[default]
    Rollback,
}

/// Cluster index configuration
///
/// # Example
///
/// ```rust
/// use geocluster::Config;
///
/// let json = r#"{
///     "geohash_precision": 6,
///     "custom_key": "position",
///     "failure_policy": "abort"
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.geohash_precision, 6);
/// assert!(config.with_clusters);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Finest precision level P (1-12, default: 10)
    #[serde(default = "Config::default_geohash_precision")]
    pub geohash_precision: usize,

    /// Document field holding the point coordinate
    #[serde(default = "Config::default_custom_key")]
    pub custom_key: String,

    /// Maintain the cluster hierarchy instead of writing flat documents
    #[serde(default = "Config::default_with_clusters")]
    pub with_clusters: bool,

    /// Retries per level after the first failed transaction
    #[serde(default = "Config::default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries; attempt `n` waits `n * retry_backoff_ms`
    #[serde(default = "Config::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Config {
    const fn default_geohash_precision() -> usize {
        10
    }

    fn default_custom_key() -> String {
        "coordinates".to_string()
    }

    const fn default_with_clusters() -> bool {
        true
    }

    const fn default_max_retries() -> u32 {
        3
    }

    const fn default_retry_backoff_ms() -> u64 {
        10
    }

    pub fn with_geohash_precision(precision: usize) -> Self {
        assert!(
            (1..=MAX_GEOHASH_PRECISION).contains(&precision),
            "Geohash precision must be between 1 and 12"
        );

        Self {
            geohash_precision: precision,
            ..Self::default()
        }
    }

    pub fn with_custom_key(mut self, key: impl Into<String>) -> Self {
        self.custom_key = key.into();
        self
    }

    pub fn with_clusters(mut self, enabled: bool) -> Self {
        self.with_clusters = enabled;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.geohash_precision < 1 || self.geohash_precision > MAX_GEOHASH_PRECISION {
            return Err("Geohash precision must be between 1 and 12".to_string());
        }

        if self.custom_key.trim().is_empty() {
            return Err("Custom key must not be empty".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geohash_precision: Self::default_geohash_precision(),
            custom_key: Self::default_custom_key(),
            with_clusters: Self::default_with_clusters(),
            max_retries: Self::default_max_retries(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
            failure_policy: FailurePolicy::default(),
        }
    }
}
