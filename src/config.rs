use std::env;
use std::time::Duration;

use thiserror::Error;

pub const PROBE_INTERVAL_ENV: &str = "FEEPRO_PROBE_INTERVAL_SECS";
pub const RETRY_BASE_ENV: &str = "FEEPRO_RETRY_BASE_SECS";
pub const MAX_RETRIES_ENV: &str = "FEEPRO_MAX_RETRIES";

pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_RETRY_BASE_SECS: u64 = 2;
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number, got {value:?}")]
    NotANumber { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Connection-monitor timing.
///
/// Retry `n` (0-based) waits `retry_base + n` seconds; after `max_retries` failed
/// probes the monitor gives up retrying and falls back to `probe_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub probe_interval: Duration,
    pub retry_base: Duration,
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            retry_base: Duration::from_secs(DEFAULT_RETRY_BASE_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    match trimmed.parse::<u64>() {
        Ok(0) => Err(ConfigError::Zero { var }),
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::NotANumber { var, value: raw }),
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds a config from any variable source. Unset or blank variables use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let probe_interval =
            parse_positive(&lookup, PROBE_INTERVAL_ENV, DEFAULT_PROBE_INTERVAL_SECS)?;
        let retry_base = parse_positive(&lookup, RETRY_BASE_ENV, DEFAULT_RETRY_BASE_SECS)?;
        let max_retries = parse_positive(&lookup, MAX_RETRIES_ENV, DEFAULT_MAX_RETRIES.into())?;
        Ok(Self {
            probe_interval: Duration::from_secs(probe_interval),
            retry_base: Duration::from_secs(retry_base),
            max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
        })
    }

    /// Wait before retry number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base + Duration::from_secs(u64::from(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.retry_delay(0), Duration::from_secs(2));
        assert_eq!(config.retry_delay(3), Duration::from_secs(5));
    }

    #[test]
    fn reads_overrides() {
        let config = SyncConfig::from_lookup(lookup(&[
            (PROBE_INTERVAL_ENV, "10"),
            (MAX_RETRIES_ENV, " 3 "),
        ]))
        .unwrap();
        assert_eq!(config.probe_interval, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base, Duration::from_secs(2));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        let err = SyncConfig::from_lookup(lookup(&[(RETRY_BASE_ENV, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotANumber {
                var: RETRY_BASE_ENV,
                value: "soon".into()
            }
        );
        let err = SyncConfig::from_lookup(lookup(&[(MAX_RETRIES_ENV, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Zero { var: MAX_RETRIES_ENV });
    }
}
