//! Execution limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds applied to every tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Wall-clock budget for one tool call, in seconds.
    #[serde(default = "default_max_query_time_secs")]
    pub max_query_time_secs: u64,

    /// Maximum rows returned by any row-producing statement.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,

    /// How long a connection waits on a locked database, in seconds.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_query_time_secs: default_max_query_time_secs(),
            max_result_rows: default_max_result_rows(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl LimitsConfig {
    /// Query budget as a [`Duration`].
    pub fn max_query_time(&self) -> Duration {
        Duration::from_secs(self.max_query_time_secs)
    }

    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

fn default_max_query_time_secs() -> u64 {
    60
}

fn default_max_result_rows() -> usize {
    10_000
}

fn default_busy_timeout_secs() -> u64 {
    30
}
