//! Pegwatch Server - host process for the assessment cache
//!
//! Owns the single process-wide cache instance and hands it to the
//! background sweep, the stats reporter and the rate limiter.

use anyhow::Result;
use clap::Parser;
use pegwatch_core::{
    init_logging, spawn_cleanup_task, spawn_stats_reporter, ConfigManager, LogLevel, RateLimiter,
    TieredCache,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pegwatch-server")]
#[command(about = "Pegwatch - stablecoin risk assessment cache")]
#[command(version)]
struct Args {
    /// Configuration file path (created with defaults if missing)
    #[arg(short, long, default_value = "pegwatch.toml", env = "PEGWATCH_CONFIG")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the expiry sweep interval in seconds
    #[arg(long)]
    cleanup_interval: Option<u64>,

    /// Override the stats report interval in seconds
    #[arg(long)]
    stats_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(args.config.clone())?;
    let mut config = config_manager.get_config().await;
    if args.debug {
        config.logging.level = LogLevel::Debug;
    }
    if let Some(secs) = args.cleanup_interval {
        config.cache.cleanup_interval_secs = secs;
    }
    if let Some(secs) = args.stats_interval {
        config.cache.stats_interval_secs = secs;
    }
    ConfigManager::validate_config(&config)?;

    init_logging(&config.logging)?;

    info!("Pegwatch Server v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  • Config File: {}", args.config.display());
    info!("  • Cleanup Interval: {}s", config.cache.cleanup_interval_secs);
    info!("  • Stats Interval: {}s", config.cache.stats_interval_secs);
    info!("  • Rate Limiting: {}", config.rate_limits.enabled);

    let cache = Arc::new(TieredCache::new());

    let cleanup_handle = spawn_cleanup_task(
        Arc::clone(&cache),
        config.cache.cleanup_interval(),
        config_manager.subscribe_shutdown(),
    );
    let stats_handle = spawn_stats_reporter(
        Arc::clone(&cache),
        config.cache.stats_interval(),
        config_manager.subscribe_shutdown(),
    );

    let rate_limiter = RateLimiter::new(Arc::clone(&cache), config.rate_limits.clone());
    info!("✓ Cache and rate limiter initialized");

    signal::ctrl_c().await?;
    info!("Received shutdown signal");

    config_manager.shutdown();
    for handle in [cleanup_handle, stats_handle] {
        if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
            warn!("Background task did not stop in time");
        }
    }

    let stats = cache.stats();
    let limiter_stats = rate_limiter.stats();
    info!(
        "Final cache stats: size={}, hits={}, misses={}, hit_ratio={:.2}",
        stats.size, stats.metrics.hits, stats.metrics.misses, stats.hit_ratio
    );
    info!(
        "Final rate limit stats: total={}, blocked={}",
        limiter_stats.total_requests, limiter_stats.blocked_requests
    );
    info!("Pegwatch Server stopped");

    Ok(())
}
