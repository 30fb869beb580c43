//! Advisor configuration.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(600);

/// Constructor input for [`Advisor`](crate::Advisor).
///
/// Durations are written in (possibly fractional) seconds:
///
/// ```toml
/// timeoutSecs = 5
/// cacheLifetimeSecs = 600
/// checkTls = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorConfig {
    /// Dial timeout for every network operation.
    #[serde(rename = "timeoutSecs", with = "duration_secs")]
    timeout: Duration,
    /// How long a TLS probe result stays cached.
    #[serde(rename = "cacheLifetimeSecs", with = "duration_secs")]
    cache_lifetime: Duration,
    /// Enables the port 443 and port 25 TLS probes.
    pub check_tls: bool,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cache_lifetime: DEFAULT_CACHE_LIFETIME,
            check_tls: true,
        }
    }
}

impl AdvisorConfig {
    pub fn new(timeout: Duration, cache_lifetime: Duration, check_tls: bool) -> Self {
        Self {
            timeout,
            cache_lifetime,
            check_tls,
        }
    }

    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(input: &str) -> AdvisorResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| AdvisorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AdvisorResult<()> {
        if self.timeout.is_zero() {
            return Err(AdvisorError::ValidationError(
                "timeoutSecs must be greater than zero".to_string(),
            ));
        }
        if self.cache_lifetime.is_zero() {
            return Err(AdvisorError::ValidationError(
                "cacheLifetimeSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Replaces zero durations with the defaults.
    pub(crate) fn or_defaults(mut self) -> Self {
        if self.timeout.is_zero() {
            warn!("[ADVISOR] Zero timeout, using {DEFAULT_TIMEOUT:?}");
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.cache_lifetime.is_zero() {
            warn!("[ADVISOR] Zero cache lifetime, using {DEFAULT_CACHE_LIFETIME:?}");
            self.cache_lifetime = DEFAULT_CACHE_LIFETIME;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache_lifetime(&self) -> Duration {
        self.cache_lifetime
    }
}

/// Serde adapter: `Duration` as a number of seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
