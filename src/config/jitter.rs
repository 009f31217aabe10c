// ABOUTME: Randomized startup delay window, in whole seconds.
// ABOUTME: Desynchronizes hosts that poll the same source on the same schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterConfig {
    pub min: u64,
    pub max: u64,
}

impl JitterConfig {
    /// A zero-width window at zero means "no jitter".
    pub fn is_enabled(&self) -> bool {
        self.max > 0
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_secs(self.min)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max)
    }
}
