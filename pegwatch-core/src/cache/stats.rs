//! Cache access metrics and stats snapshots

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running access counters
///
/// Counters only ever grow; clearing the cache does not reset them.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups that returned a live entry
    hits: AtomicU64,
    /// Lookups that found nothing or an expired entry
    misses: AtomicU64,
    /// Entries written
    sets: AtomicU64,
    /// Entries removed by explicit deletion
    deletes: AtomicU64,
    /// Expired entries physically removed (lazily or by sweep)
    expirations: AtomicU64,
}

impl CacheMetrics {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total sets
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    /// Get total explicit deletions
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Get total expired removals
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`, or 0 when nothing has been looked up
    pub fn hit_ratio(&self) -> f64 {
        self.snapshot().hit_ratio()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            sets: self.sets(),
            deletes: self.deletes(),
            expirations: self.expirations(),
        }
    }
}

/// Plain copy of the counters at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expirations: u64,
}

impl MetricsSnapshot {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_ratio(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Point-in-time view of the cache returned by `TieredCache::stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Entries physically stored, expired or not
    pub size: usize,
    /// Entries still observable
    pub active_items: usize,
    /// Entries past expiry awaiting lazy deletion or the next sweep
    pub expired_items: usize,
    pub hit_ratio: f64,
    pub metrics: MetricsSnapshot,
}

impl CacheStatsSnapshot {
    /// Operator-facing grade of the hit ratio: `Excellent` from 80%, `Good`
    /// from 60%, `Fair` from 40%, otherwise `Poor`
    pub fn performance_grade(&self) -> &'static str {
        let percent = self.hit_ratio * 100.0;
        if percent >= 80.0 {
            "Excellent"
        } else if percent >= 60.0 {
            "Good"
        } else if percent >= 40.0 {
            "Fair"
        } else {
            "Poor"
        }
    }
}
