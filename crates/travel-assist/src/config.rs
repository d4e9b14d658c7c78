use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the travel backend client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend, without the `/api` path.
    pub base_url: String,
    /// Timeout for single-shot requests and for establishing streams.
    pub timeout: Duration,
    /// Maximum wait for the next chunk of a streamed answer.
    ///
    /// `None` waits indefinitely; the protocol itself has no timeout.
    pub stream_idle_timeout: Option<Duration>,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stream_idle_timeout: None,
            user_agent: format!("travel-assist/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from the process environment.
    ///
    /// - `TRAVEL_API_URL`: backend base URL (default `http://localhost:8000`).
    /// - `TRAVEL_API_TIMEOUT_SECS`: request timeout in seconds (default 120).
    /// - `TRAVEL_STREAM_IDLE_TIMEOUT_SECS`: per-chunk idle timeout; unset or `0`
    ///   disables it.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(url) = lookup("TRAVEL_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse_secs(&lookup, "TRAVEL_API_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs(&lookup, "TRAVEL_STREAM_IDLE_TIMEOUT_SECS")? {
            config.stream_idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-chunk idle timeout for streamed answers.
    pub fn stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = Some(timeout);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, ClientError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{key} must be a whole number of seconds, got {raw:?}"))),
    }
}
