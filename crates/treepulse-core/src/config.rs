use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const MIN_INTERVAL_MS: u64 = 10;

/// Timing knobs injected into the scheduler and the search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub skip_polling_while_searching: bool,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            skip_polling_while_searching: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval = Duration::from_millis(millis.max(MIN_INTERVAL_MS));
        self
    }

    pub fn with_search_debounce_ms(mut self, millis: u64) -> Self {
        self.search_debounce = Duration::from_millis(millis);
        self
    }

    /// Poll interval with the floor applied; `tokio::time::interval` panics on zero.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval
            .max(Duration::from_millis(MIN_INTERVAL_MS))
    }
}
