//! Read-through access for computed assessments
//!
//! On a miss the caller's computation runs and a successful result is stored
//! with the tier's TTL. Concurrent misses for the same key are not coalesced:
//! each caller that misses runs its own computation and the last write wins.

use crate::cache::tier::Tier;
use crate::cache::tiered_cache::TieredCache;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

impl TieredCache {
    /// Return the cached value for `key`, computing and storing it on a miss
    ///
    /// Errors from `compute` are returned unchanged and nothing is cached.
    /// A `null` result is returned but not cached.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, tier: Tier, compute: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        debug!("Cache miss for {}, computing ({})", key, tier);
        let value = compute().await?;
        if !value.is_null() {
            self.set_in_tier(key, value.clone(), tier);
        }
        Ok(value)
    }
}
