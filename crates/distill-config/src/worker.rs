//! Worker process configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Claims older than this are considered abandoned by a crashed worker.
const fn default_stale_claim_secs() -> u64 {
    1800
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_stale_claim_secs")]
    pub stale_claim_secs: u64,

    /// Period of the in-worker stale-claim sweep. `0` disables it.
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stale_claim_secs: default_stale_claim_secs(),
            sweep_interval_secs: 0,
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub const fn stale_claim_age(&self) -> Duration {
        Duration::from_secs(self.stale_claim_secs)
    }

    /// `None` when the periodic sweep is disabled.
    #[must_use]
    pub const fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep_interval_secs))
        }
    }
}
