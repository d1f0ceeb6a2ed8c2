use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const PREFIX: &str = "filter.";

/// Process-wide split filtering options.
///
/// Deserializes from a nested table (`[filter]` / `[filter.cache]`) or from
/// flat `filter.*` properties via [`FilterConfig::from_properties`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterConfig {
    /// Master switch. When off the cache stays inert and filtering passes
    /// splits through unchanged.
    pub enabled: bool,

    pub cache: CacheConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Entries expire this long after they were loaded
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Maximum number of resident cache entries
    pub max_entries: usize,

    /// Background loader threads, capped by the host's parallelism
    pub loading_threads: usize,

    /// Delay applied before each background load
    #[serde(with = "humantime_serde")]
    pub loading_delay: Duration,

    /// Upper bound on a single background load
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_entries: 10_000,
            loading_threads: 2,
            loading_delay: Duration::from_secs(10),
            load_timeout: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Loader threads actually started: at least one, at most the available
    /// parallelism.
    pub fn effective_loading_threads(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.loading_threads.clamp(1, available)
    }
}

impl FilterConfig {
    /// Enabled configuration with default cache settings.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            cache: CacheConfig::default(),
        }
    }

    /// Build a configuration from flat properties such as
    /// `filter.cache.loading-delay=5s`.
    ///
    /// Keys outside the `filter.` namespace are ignored. Key matching is
    /// case-insensitive and ignores `-` and `_`, so `filter.cache.maxEntries`
    /// and `filter.cache.max-entries` name the same option.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use split_prune::FilterConfig;
    ///
    /// let config = FilterConfig::from_properties([
    ///     ("filter.enabled", "true"),
    ///     ("filter.cache.loadingDelay", "500ms"),
    ///     ("query.max-memory", "1GB"),
    /// ])
    /// .unwrap();
    /// assert!(config.enabled);
    /// assert_eq!(config.cache.loading_delay, Duration::from_millis(500));
    /// ```
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = FilterConfig::default();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let normalized = key.to_ascii_lowercase().replace(['-', '_'], "");
            let Some(option) = normalized.strip_prefix(PREFIX) else {
                continue;
            };
            match option {
                "enabled" => config.enabled = parse_bool(key, value)?,
                "cache.ttl" => config.cache.ttl = parse_duration(key, value)?,
                "cache.maxentries" => config.cache.max_entries = parse_count(key, value)?,
                "cache.loadingthreads" => config.cache.loading_threads = parse_count(key, value)?,
                "cache.loadingdelay" => config.cache.loading_delay = parse_duration(key, value)?,
                "cache.loadtimeout" => config.cache.load_timeout = parse_duration(key, value)?,
                _ => {
                    return Err(ConfigError::UnknownOption {
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(config)
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(0) => Err(invalid(key, value, "must be positive")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, value, e.to_string())),
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| invalid(key, value, e.to_string()))
}
