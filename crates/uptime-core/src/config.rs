use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a monitoring engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed period between scheduler scans for due monitors (default: 2000 ms).
    pub tick_interval: Duration,
    /// Maximum number of probes in flight at once (default: 10).
    pub max_concurrent_probes: usize,
    /// Consecutive failures before a DOWN alert fires (default: 3).
    pub alert_threshold: u32,
    /// Safety valve: maximum due monitors picked up per scan (default: 200).
    pub due_scan_limit: usize,
    /// Connect timeout for the shared probe client.
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(2000),
            max_concurrent_probes: 10,
            alert_threshold: 3,
            due_scan_limit: 200,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn with_tick_interval(mut self, ms: u64) -> Self {
        self.tick_interval = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max.max(1);
        self
    }

    pub fn with_alert_threshold(mut self, threshold: u32) -> Self {
        self.alert_threshold = threshold.max(1);
        self
    }

    pub fn with_due_scan_limit(mut self, limit: usize) -> Self {
        self.due_scan_limit = limit.max(1);
        self
    }
}
