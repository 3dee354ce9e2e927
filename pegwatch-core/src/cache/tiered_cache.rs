//! Tiered TTL cache implementation

use crate::cache::entry::CacheEntry;
use crate::cache::error::{CacheError, CacheResult};
use crate::cache::keys;
use crate::cache::stats::{CacheMetrics, CacheStatsSnapshot};
use crate::cache::tier::Tier;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// In-process result cache with per-entry expiry and access metrics
///
/// Mutations (`set`, `delete`, `clear`, `cleanup`, lazy deletion of an
/// expired entry) hold the write lock; successful lookups and `stats` share
/// the read lock. The cache is unbounded: entries leave only through
/// expiry or explicit removal.
pub struct TieredCache {
    /// Cache storage (key -> entry)
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Access counters
    metrics: CacheMetrics,
}

impl TieredCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        }
    }

    /// Store `value` under `key` for `ttl_secs` seconds, replacing any
    /// existing entry
    pub fn set(&self, key: impl Into<String>, value: Value, ttl_secs: u64) {
        self.set_with_ttl(key, value, Duration::from_secs(ttl_secs));
    }

    /// Store `value` under `key` for `ttl`
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry::new(value, ttl, Utc::now());

        let mut entries = self.entries.write();
        entries.insert(key, entry);
        self.metrics.record_set();
    }

    /// Store `value` with the TTL of `tier`
    pub fn set_in_tier(&self, key: impl Into<String>, value: Value, tier: Tier) {
        self.set_with_ttl(key, value, tier.ttl());
    }

    /// Store `value` with the TTL of the numbered tier (1, 2 or 3)
    pub fn set_for_tier(&self, key: impl Into<String>, value: Value, tier: u8) -> CacheResult<()> {
        let tier = Tier::try_from(tier)?;
        self.set_in_tier(key, value, tier);
        Ok(())
    }

    /// Serialize `value` to JSON and store it for `ttl_secs` seconds
    pub fn set_serialized<T>(&self, key: impl Into<String>, value: &T, ttl_secs: u64) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl_secs);
        Ok(())
    }

    /// Get a live value from cache
    ///
    /// An expired entry counts as a miss and is removed on the spot.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key, |entry| entry.value.clone())
    }

    /// Get a live value and deserialize it into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        self.get(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(CacheError::from)
    }

    /// Check if a live entry exists; counts as a lookup
    pub fn exists(&self, key: &str) -> bool {
        self.lookup(key, |_| ()).is_some()
    }

    /// Remaining lifetime of a live entry. Does not touch metrics.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Utc::now();
        self.entries.read().get(key)?.remaining_at(now)
    }

    /// Expiry instant of a live entry. Does not touch metrics.
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.expires_at)
    }

    /// Remove an entry; returns whether one was removed
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(key).is_some();
        if removed {
            self.metrics.record_deletes(1);
        }
        removed
    }

    /// Remove every entry in `namespace`; returns how many were removed
    pub fn invalidate_namespace(&self, namespace: &str) -> usize {
        let prefix = keys::namespace_prefix(namespace);

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - entries.len();
        self.metrics.record_deletes(removed as u64);
        drop(entries);

        info!("Invalidated {} cache entries for namespace '{}'", removed, namespace);
        removed
    }

    /// Remove all entries. Metrics are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let cleared = entries.len();
        entries.clear();
        drop(entries);

        debug!("Cleared {} cache entries", cleared);
    }

    /// Physically remove every expired entry; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        self.metrics.record_expirations(removed as u64);
        drop(entries);

        if removed > 0 {
            info!("Cleaned up {} expired cache entries", removed);
        }
        removed
    }

    /// Add `amount` to the integer counter at `key`
    ///
    /// A missing or expired counter starts over at `amount` and lives for
    /// `ttl`; a live counter keeps its original expiry.
    pub fn increment(&self, key: &str, amount: i64, ttl: Duration) -> CacheResult<i64> {
        let now = Utc::now();
        let mut entries = self.entries.write();

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired_at(now) {
                let current = entry
                    .value
                    .as_i64()
                    .ok_or_else(|| CacheError::NotACounter(key.to_string()))?;
                let next = current.saturating_add(amount);
                entry.value = Value::from(next);
                return Ok(next);
            }
        }

        let replaced = entries.insert(key.to_string(), CacheEntry::new(Value::from(amount), ttl, now));
        if replaced.is_some() {
            self.metrics.record_expirations(1);
        }
        Ok(amount)
    }

    /// Current value of a live counter, or 0. Does not touch metrics.
    pub fn peek_counter(&self, key: &str) -> i64 {
        let now = Utc::now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .and_then(|entry| entry.value.as_i64())
            .unwrap_or(0)
    }

    /// Snapshot of entry counts and access metrics
    pub fn stats(&self) -> CacheStatsSnapshot {
        let now = Utc::now();
        let entries = self.entries.read();

        let size = entries.len();
        let active_items = entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count();
        let metrics = self.metrics.snapshot();

        CacheStatsSnapshot {
            size,
            active_items,
            expired_items: size - active_items,
            hit_ratio: metrics.hit_ratio(),
            metrics,
        }
    }

    /// Get access counters
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Get number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn lookup<R>(&self, key: &str, read: impl FnOnce(&CacheEntry) -> R) -> Option<R> {
        let now = Utc::now();

        let stale = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    self.metrics.record_hit();
                    return Some(read(entry));
                }
                Some(_) => true,
                None => false,
            }
        };

        self.metrics.record_miss();
        if stale {
            self.remove_if_expired(key, now);
        }
        None
    }

    fn remove_if_expired(&self, key: &str, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        // A concurrent set may have replaced the entry since the read lock was released
        if matches!(entries.get(key), Some(entry) if entry.is_expired_at(now)) {
            entries.remove(key);
            self.metrics.record_expirations(1);
            debug!("Lazily removed expired cache entry {}", key);
        }
    }
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}
