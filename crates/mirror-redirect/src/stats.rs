//! Atomic discovery statistics counters.
//!
//! All atomics use `Relaxed` ordering. These are monotonic display counters
//! with no synchronization requirements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Default)]
struct StatsInner {
    checks_served: AtomicU64,
    cache_hits: AtomicU64,
    discoveries: AtomicU64,
    probes_issued: AtomicU64,
    probes_available: AtomicU64,
}

/// Thread-safe discovery statistics. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct DiscoveryStats {
    inner: Arc<StatsInner>,
}

/// Snapshot of current counter values, serializable to JSON.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub checks_served: u64,
    pub cache_hits: u64,
    pub discoveries: u64,
    pub probes_issued: u64,
    pub probes_available: u64,
}

impl DiscoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_checks(&self) {
        self.inner.checks_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_discoveries(&self) {
        self.inner.discoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_probes(&self, issued: u64, available: u64) {
        self.inner.probes_issued.fetch_add(issued, Ordering::Relaxed);
        self.inner
            .probes_available
            .fetch_add(available, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            checks_served: self.inner.checks_served.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            discoveries: self.inner.discoveries.load(Ordering::Relaxed),
            probes_issued: self.inner.probes_issued.load(Ordering::Relaxed),
            probes_available: self.inner.probes_available.load(Ordering::Relaxed),
        }
    }
}
