use std::time::Duration;

use crate::config::CacheConfig;

/// Per-query caching behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a successful result is served without refetching
    pub stale_time: Duration,
    /// Extra attempts after a retryable read failure
    pub retry: u32,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl From<&CacheConfig> for QueryOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            stale_time: Duration::from_secs(config.stale_time_secs),
            retry: config.read_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl QueryOptions {
    /// Never serve from cache without refetching (list views)
    pub fn always_stale(self) -> Self {
        self.with_stale_time(Duration::ZERO)
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}
