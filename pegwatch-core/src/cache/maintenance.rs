//! Background maintenance for the cache
//!
//! Two periodic tasks run next to request handling: the expiry sweep, which
//! bounds memory held by entries that are written but never read again, and
//! the stats reporter, which logs a snapshot for operators.

use crate::cache::tiered_cache::TieredCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Sweep interval used when none is configured
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn a task that calls [`TieredCache::cleanup`] every `interval` until
/// `shutdown` fires
pub fn spawn_cleanup_task(
    cache: Arc<TieredCache>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!("Starting cache cleanup task (every {:?})", interval);
    spawn_periodic("cleanup", interval, shutdown, move || {
        let removed = cache.cleanup();
        debug!("Cache sweep removed {} entries", removed);
    })
}

/// Spawn a task that logs [`TieredCache::stats`] every `interval` until
/// `shutdown` fires
pub fn spawn_stats_reporter(
    cache: Arc<TieredCache>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    spawn_periodic("stats", interval, shutdown, move || {
        let stats = cache.stats();
        info!(
            size = stats.size,
            active = stats.active_items,
            expired = stats.expired_items,
            hits = stats.metrics.hits,
            misses = stats.metrics.misses,
            sets = stats.metrics.sets,
            deletes = stats.metrics.deletes,
            grade = stats.performance_grade(),
            "Cache hit ratio {:.2}%",
            stats.hit_ratio * 100.0
        );
    })
}

fn spawn_periodic<F>(
    name: &'static str,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => tick(),
                _ = shutdown.recv() => {
                    info!("Cache {} task shutting down", name);
                    break;
                }
            }
        }
    })
}
