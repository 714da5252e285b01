use std::time::Duration;

use crate::error::ApiError;
use crate::poll::PollPolicy;

pub const API_URL_VAR: &str = "AVA_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "AVA_REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_VAR: &str = "AVA_POLL_INTERVAL_MS";
pub const POLL_MAX_INTERVAL_VAR: &str = "AVA_POLL_MAX_INTERVAL_MS";
pub const POLL_TIMEOUT_VAR: &str = "AVA_POLL_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll: PollPolicy,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// | Variable                   | Default | Purpose                      |
    /// |----------------------------|---------|------------------------------|
    /// | `AVA_API_URL`              | —       | Base URL of the API (required) |
    /// | `AVA_REQUEST_TIMEOUT_SECS` | `30`    | Per-request timeout          |
    /// | `AVA_POLL_INTERVAL_MS`     | `1000`  | First delay between polls    |
    /// | `AVA_POLL_MAX_INTERVAL_MS` | `8000`  | Longest delay between polls  |
    /// | `AVA_POLL_TIMEOUT_SECS`    | `300`   | Give up on a job after this  |
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(API_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ApiError::Client("API URL is not defined in environment variables".to_string())
            })?;

        let mut config = Self::new(base_url);

        if let Some(secs) = parse_var(&lookup, REQUEST_TIMEOUT_VAR)? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, POLL_INTERVAL_VAR)? {
            config.poll.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, POLL_MAX_INTERVAL_VAR)? {
            config.poll.max_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, POLL_TIMEOUT_VAR)? {
            config.poll.max_wait = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Result<Option<u64>, ApiError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ApiError::Client(format!(
                "{key} must be a positive whole number, got {raw:?}"
            ))),
            Ok(n) => Ok(Some(n)),
        },
    }
}
