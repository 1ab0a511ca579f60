//! Application configuration
//!
//! Read once at startup from `WHITEBEARD_*` environment variables. Every
//! setting has a default, so an empty environment is a valid configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use universities_client::client::DEFAULT_BASE_URL;

/// Base URL of the universities API
pub const ENV_API_URL: &str = "WHITEBEARD_API_URL";
/// Log every request and response when truthy
pub const ENV_ENABLE_API_LOGS: &str = "WHITEBEARD_ENABLE_API_LOGS";
/// Request timeout in seconds
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "WHITEBEARD_REQUEST_TIMEOUT_SECS";
/// Search debounce window in milliseconds
pub const ENV_DEBOUNCE_MS: &str = "WHITEBEARD_DEBOUNCE_MS";
/// Characters a search query must exceed before it is sent
pub const ENV_MIN_QUERY_LENGTH: &str = "WHITEBEARD_MIN_QUERY_LENGTH";
/// Retries for transient request failures
pub const ENV_MAX_RETRIES: &str = "WHITEBEARD_MAX_RETRIES";
/// Path of the key-value store
pub const ENV_KV_PATH: &str = "WHITEBEARD_KV_PATH";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the universities API
    pub api_url: String,
    /// Log API traffic
    pub enable_api_logs: bool,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Quiescence window for the search box
    pub debounce_window: Duration,
    /// Non-empty queries must be longer than this many characters
    pub min_query_length: usize,
    /// Retries for transient request failures (0 disables retrying)
    pub max_retries: usize,
    /// Key-value store location
    pub kv_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            enable_api_logs: false,
            request_timeout: Duration::from_secs(30),
            debounce_window: Duration::from_millis(500),
            min_query_length: 0,
            max_retries: 0,
            kv_path: PathBuf::from("whitebeard_kv.db"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(ENV_API_URL)) {
            config.api_url = url;
        }
        if let Some(flag) = lookup(ENV_ENABLE_API_LOGS) {
            config.enable_api_logs = is_truthy(&flag);
        }
        if let Some(secs) = parse_number::<u64>(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_number::<u64>(&lookup, ENV_DEBOUNCE_MS)? {
            config.debounce_window = Duration::from_millis(ms);
        }
        if let Some(len) = parse_number::<usize>(&lookup, ENV_MIN_QUERY_LENGTH)? {
            config.min_query_length = len;
        }
        if let Some(retries) = parse_number::<usize>(&lookup, ENV_MAX_RETRIES)? {
            config.max_retries = retries;
        }
        if let Some(path) = non_empty(lookup(ENV_KV_PATH)) {
            config.kv_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Enable or disable API logs
    pub fn with_api_logs(mut self, enabled: bool) -> Self {
        self.enable_api_logs = enabled;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the debounce window
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Set the minimum query length
    pub fn with_min_query_length(mut self, len: usize) -> Self {
        self.min_query_length = len;
        self
    }

    /// Set the retry count for transient failures
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the key-value store path
    pub fn with_kv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kv_path = path.into();
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty(lookup(key))
        .map(|raw| raw.parse::<T>().with_context(|| format!("{key} must be a number, got {raw:?}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api_url, "http://universities.hipolabs.com");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        assert_eq!(config.max_retries, 0);
        assert!(!config.enable_api_logs);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_API_URL, "http://localhost:8080"),
            (ENV_ENABLE_API_LOGS, "TRUE"),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
            (ENV_DEBOUNCE_MS, "250"),
            (ENV_MIN_QUERY_LENGTH, "2"),
            (ENV_MAX_RETRIES, "3"),
            (ENV_KV_PATH, "/tmp/wb.db"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080");
        assert!(config.enable_api_logs);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.debounce_window, Duration::from_millis(250));
        assert_eq!(config.min_query_length, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.kv_path, PathBuf::from("/tmp/wb.db"));
    }

    #[test]
    fn test_log_flag_values() {
        for value in ["1", "true", "yes", "on", " On "] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "off", "", "enabled"] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[(ENV_API_URL, "  "), (ENV_DEBOUNCE_MS, "")])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_DEBOUNCE_MS, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_DEBOUNCE_MS));
    }
}
