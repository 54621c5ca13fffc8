use std::time::Duration;

use crate::error::ClientError;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the school REST API, without a trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request, if set.
    pub api_token: Option<String>,
    /// Caller-imposed request timeout. Expiry surfaces as a retryable
    /// transport error and never changes local state.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// | Env Var                           | Default |
    /// |-----------------------------------|---------|
    /// | `SCHOOLDESK_API_URL`              | --      |
    /// | `SCHOOLDESK_API_TOKEN`            | unset   |
    /// | `SCHOOLDESK_REQUEST_TIMEOUT_SECS` | `30`    |
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SCHOOLDESK_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ClientError::Config("SCHOOLDESK_API_URL must be set".to_string()))?;

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "SCHOOLDESK_API_URL must be an http(s) URL (got '{base_url}')"
            )));
        }

        let api_token = lookup("SCHOOLDESK_API_TOKEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let timeout_secs = match lookup("SCHOOLDESK_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ClientError::Config(format!(
                    "SCHOOLDESK_REQUEST_TIMEOUT_SECS must be a positive integer (got '{raw}')"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            api_token,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
