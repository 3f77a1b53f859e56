//! Per-manager counters.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of a manager's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    pub tx_sent: u64,
    pub tx_failed: u64,
    pub proofs_generated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl ManagerStats {
    /// Share of proof lookups served from cache, in `[0, 1]`.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Counters owned by one manager instance.
#[derive(Debug, Default)]
pub(crate) struct ManagerMetrics {
    inner: Mutex<ManagerStats>,
}

impl ManagerMetrics {
    pub(crate) fn update(&self, f: impl FnOnce(&mut ManagerStats)) {
        f(&mut self.inner.lock());
    }

    pub(crate) fn snapshot(&self) -> ManagerStats {
        *self.inner.lock()
    }
}
