//! Configuration for the HTTP polling source.

use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default number of consecutive failures before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`super::HttpPollingSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL; status paths are appended to it.
    pub api_url: String,

    /// How often to poll.
    pub poll_interval: Duration,

    /// Consecutive failures tolerated before the stream reports an error.
    pub max_retries: u32,

    pub request_timeout: Duration,
}

impl HttpSourceConfig {
    pub fn new(api_url: impl Into<String>, poll_interval_secs: u64, max_retries: u32) -> Self {
        Self {
            api_url: api_url.into(),
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_retries,
            ..Default::default()
        }
    }
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpSourceConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_new_keeps_timeout_default() {
        let config = HttpSourceConfig::new("https://bus.example.com/api", 2, 9);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_retries, 9);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
