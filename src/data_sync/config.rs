use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the data synchronization layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSyncConfig {
    /// Buffer size of the block header channel feeding the refresh task
    pub channel_buffer_size: usize,
    /// Maximum number of pair refreshes running at the same time
    pub max_concurrent_refreshes: usize,
    /// Timeout of one pair refresh in seconds
    pub refresh_timeout_secs: u64,
    /// Oldest snapshot, in blocks behind the current block, a search may use
    pub max_snapshot_age_blocks: u64,
    /// Attempts of the route retry loop
    pub retry_attempts: u32,
    /// First backoff of the route retry loop in milliseconds
    pub retry_initial_backoff_ms: u64,
    pub retry_backoff_multiplier: f64,
}

impl Default for DataSyncConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 100,
            max_concurrent_refreshes: 16,
            refresh_timeout_secs: 10,
            max_snapshot_age_blocks: 3,
            retry_attempts: 5,
            retry_initial_backoff_ms: 200,
            retry_backoff_multiplier: 2.0,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> eyre::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map(Some).map_err(|e| eyre::eyre!("Invalid {}: {}", name, e)),
        Err(_) => Ok(None),
    }
}

impl DataSyncConfig {
    /// Load configuration from environment variables, keeping defaults for unset ones
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Some(channel_buffer_size) = parse_env("CHANNEL_BUFFER_SIZE")? {
            config.channel_buffer_size = channel_buffer_size;
        }
        if let Some(max_concurrent_refreshes) = parse_env("MAX_CONCURRENT_REFRESHES")? {
            config.max_concurrent_refreshes = max_concurrent_refreshes;
        }
        if let Some(refresh_timeout_secs) = parse_env("REFRESH_TIMEOUT_SECS")? {
            config.refresh_timeout_secs = refresh_timeout_secs;
        }
        if let Some(max_snapshot_age_blocks) = parse_env("MAX_SNAPSHOT_AGE_BLOCKS")? {
            config.max_snapshot_age_blocks = max_snapshot_age_blocks;
        }
        if let Some(retry_attempts) = parse_env("ROUTE_RETRY_ATTEMPTS")? {
            config.retry_attempts = retry_attempts;
        }
        if let Some(retry_initial_backoff_ms) = parse_env("ROUTE_RETRY_INITIAL_BACKOFF_MS")? {
            config.retry_initial_backoff_ms = retry_initial_backoff_ms;
        }
        if let Some(retry_backoff_multiplier) = parse_env::<f64>("ROUTE_RETRY_BACKOFF_MULTIPLIER")? {
            if retry_backoff_multiplier < 1.0 {
                return Err(eyre::eyre!("Invalid ROUTE_RETRY_BACKOFF_MULTIPLIER: {} is below 1", retry_backoff_multiplier));
            }
            config.retry_backoff_multiplier = retry_backoff_multiplier;
        }

        Ok(config)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn retry_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_initial_backoff_ms)
    }
}
