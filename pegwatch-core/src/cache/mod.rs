//! Result cache for computed assessment data
//!
//! Entries are keyed by namespaced strings, carry an absolute expiry and are
//! grouped into freshness tiers that select their TTL.

pub mod entry;
pub mod error;
pub mod keys;
pub mod maintenance;
pub mod read_through;
pub mod stats;
pub mod tier;
pub mod tiered_cache;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use maintenance::{spawn_cleanup_task, spawn_stats_reporter};
pub use stats::{CacheMetrics, CacheStatsSnapshot, MetricsSnapshot};
pub use tier::{Tier, DEFAULT_TTL};
pub use tiered_cache::TieredCache;
