use std::time::Duration;

use anyhow::{bail, Context};
use schooldesk_client::config::ClientConfig;
use schooldesk_core::types::DbId;

/// Default seconds between dashboard refreshes.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_LOCALE: &str = "en";

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub client: ClientConfig,
    /// Student whose dashboard is refreshed.
    pub student_id: DbId,
    pub refresh_interval: Duration,
    /// Locale used for titles in log output.
    pub locale: String,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `STUDENT_ID`            | --      |
    /// | `REFRESH_INTERVAL_SECS` | `60`    |
    /// | `SCHOOLDESK_LOCALE`     | `en`    |
    ///
    /// plus the client variables read by [`ClientConfig::from_env`].
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = ClientConfig::from_lookup(&lookup)?;

        let student_id: DbId = lookup("STUDENT_ID")
            .context("STUDENT_ID environment variable is required")?
            .trim()
            .parse::<DbId>()
            .context("STUDENT_ID must be a valid integer")?;

        let refresh_secs: u64 = match lookup("REFRESH_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("REFRESH_INTERVAL_SECS must be an integer (got '{raw}')"))?,
            None => DEFAULT_REFRESH_INTERVAL_SECS,
        };
        if refresh_secs == 0 {
            bail!("REFRESH_INTERVAL_SECS must be greater than zero");
        }

        let locale = lookup("SCHOOLDESK_LOCALE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        Ok(Self {
            client,
            student_id,
            refresh_interval: Duration::from_secs(refresh_secs),
            locale,
        })
    }
}
