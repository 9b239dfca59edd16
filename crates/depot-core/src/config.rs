//! Runtime configuration for the sync layer.
//!
//! Values come from the environment (`DEPOT_*`) with defaults suitable for a
//! local development API. Callers may override individual values with the
//! builder methods after loading.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// What happens to records still marked pending when the remote result
/// replaces a cached collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheRetention {
    /// The remote result replaces the cache outright, pending records included.
    #[default]
    Authoritative,
    /// Records still marked pending are carried over into the replaced cache.
    KeepPending,
}

impl FromStr for CacheRetention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authoritative" => Ok(Self::Authoritative),
            "keep-pending" | "keep_pending" => Ok(Self::KeepPending),
            other => Err(Error::Config(format!(
                "DEPOT_CACHE_RETENTION must be `authoritative` or `keep-pending`, got `{other}`"
            ))),
        }
    }
}

/// Settings shared by the remote client, coordinator, and background tickers.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Remote base URL without trailing slash (e.g. `https://ops.example.com`)
    pub api_url: String,
    /// Optional bearer token sent with every request
    pub api_token: Option<String>,
    /// Deadline applied to every remote call
    pub request_timeout: Duration,
    /// Retry queue tick
    pub retry_interval: Duration,
    /// Health probe tick
    pub health_interval: Duration,
    /// Failed replays after which a task is abandoned
    pub max_retries: u32,
    pub cache_retention: CacheRetention,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("retry_interval", &self.retry_interval)
            .field("health_interval", &self.health_interval)
            .field("max_retries", &self.max_retries)
            .field("cache_retention", &self.cache_retention)
            .finish()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            cache_retention: CacheRetention::Authoritative,
        }
    }
}

impl SyncSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    /// Load settings through an arbitrary lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url =
            normalize_api_url(&value_or_default(&lookup, "DEPOT_API_URL", DEFAULT_API_URL))?;
        let api_token = normalize_text_option(lookup("DEPOT_API_TOKEN"));

        let request_timeout = parse_secs(
            &lookup,
            "DEPOT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let retry_interval = parse_secs(
            &lookup,
            "DEPOT_RETRY_INTERVAL_SECS",
            DEFAULT_RETRY_INTERVAL_SECS,
        )?;
        let health_interval = parse_secs(
            &lookup,
            "DEPOT_HEALTH_INTERVAL_SECS",
            DEFAULT_HEALTH_INTERVAL_SECS,
        )?;

        let max_retries =
            value_or_default(&lookup, "DEPOT_MAX_RETRIES", &DEFAULT_MAX_RETRIES.to_string())
                .parse::<u32>()
                .map_err(|_| {
                    Error::Config("DEPOT_MAX_RETRIES must be a positive integer".to_string())
                })?;
        if max_retries == 0 {
            return Err(Error::Config("DEPOT_MAX_RETRIES must be >= 1".to_string()));
        }

        let cache_retention =
            value_or_default(&lookup, "DEPOT_CACHE_RETENTION", "authoritative").parse()?;

        Ok(Self {
            api_url,
            api_token,
            request_timeout,
            retry_interval,
            health_interval,
            max_retries,
            cache_retention,
        })
    }

    /// Override the remote base URL.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        self.api_url = normalize_api_url(api_url)?;
        Ok(self)
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_cache_retention(mut self, retention: CacheRetention) -> Self {
        self.cache_retention = retention;
        self
    }
}

fn value_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> String {
    normalize_text_option(lookup(name)).unwrap_or_else(|| default.to_string())
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration> {
    let secs = value_or_default(lookup, name, &default.to_string())
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{name} must be an integer >= 1")))?;
    if secs == 0 {
        return Err(Error::Config(format!("{name} must be >= 1")));
    }
    Ok(Duration::from_secs(secs))
}

fn normalize_api_url(raw: &str) -> Result<String> {
    let url = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config("DEPOT_API_URL must not be empty".to_string()))?;
    if !is_http_url(&url) {
        return Err(Error::Config(
            "DEPOT_API_URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let settings = SyncSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, SyncSettings::default());
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn parses_overrides() {
        let settings = SyncSettings::from_lookup(lookup_from(&[
            ("DEPOT_API_URL", " https://ops.example.com/ "),
            ("DEPOT_API_TOKEN", "secret"),
            ("DEPOT_REQUEST_TIMEOUT_SECS", "4"),
            ("DEPOT_RETRY_INTERVAL_SECS", "2"),
            ("DEPOT_HEALTH_INTERVAL_SECS", "60"),
            ("DEPOT_MAX_RETRIES", "5"),
            ("DEPOT_CACHE_RETENTION", "keep-pending"),
        ]))
        .unwrap();

        assert_eq!(settings.api_url, "https://ops.example.com");
        assert_eq!(settings.api_token.as_deref(), Some("secret"));
        assert_eq!(settings.request_timeout, Duration::from_secs(4));
        assert_eq!(settings.retry_interval, Duration::from_secs(2));
        assert_eq!(settings.health_interval, Duration::from_secs(60));
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.cache_retention, CacheRetention::KeepPending);
    }

    #[test]
    fn rejects_invalid_values() {
        let invalid = [
            ("DEPOT_API_URL", "ops.example.com"),
            ("DEPOT_MAX_RETRIES", "0"),
            ("DEPOT_RETRY_INTERVAL_SECS", "soon"),
            ("DEPOT_HEALTH_INTERVAL_SECS", "0"),
            ("DEPOT_CACHE_RETENTION", "merge"),
        ];
        for pair in invalid {
            assert!(
                SyncSettings::from_lookup(lookup_from(&[pair])).is_err(),
                "{pair:?} should be rejected"
            );
        }
    }

    #[test]
    fn debug_redacts_token() {
        let settings = SyncSettings {
            api_token: Some("super-secret".to_string()),
            ..SyncSettings::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
