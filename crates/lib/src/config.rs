//! Sync configuration.
//!
//! [`SyncConfig`] gathers the values a host needs to wire up a sync stack:
//! where the remote store lives, how long one batch may take, when the daily
//! scheduled syncs fire, and how often the host should probe reachability.
//! It deserializes from JSON (durations in whole seconds, times as `HH:MM`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::sync::schedule::SyncSchedule;

/// Errors in configuration values.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A schedule entry was not a valid `HH:MM` time.
    #[error("Invalid time '{input}', expected HH:MM")]
    InvalidTime { input: String },

    /// The endpoint is not a usable base URL.
    #[error("Invalid endpoint '{input}': {reason}")]
    InvalidEndpoint { input: String, reason: String },

    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Settings for the device-side sync stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base URL of the remote store; batches go to `<endpoint>/sync`.
    pub endpoint: Url,
    /// Deadline for one batch round trip.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Daily times for scheduled syncs.
    pub schedule: SyncSchedule,
    /// How often hosts should re-check reachability.
    #[serde(with = "duration_secs")]
    pub probe_interval: Duration,
}

impl SyncConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse { source })
    }

    /// Parse and validate an endpoint URL.
    pub fn parse_endpoint(input: &str) -> Result<Url, ConfigError> {
        let url = Url::parse(input).map_err(|e| ConfigError::InvalidEndpoint {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                input: input.to_string(),
                reason: "expected an http(s) base URL".to_string(),
            });
        }
        Ok(url)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT is a valid URL"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            schedule: SyncSchedule::default(),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
