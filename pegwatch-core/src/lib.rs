//! Pegwatch Core - result cache for stablecoin risk assessments
//!
//! This crate provides:
//! - A tiered, TTL-bounded in-process cache with access metrics
//! - Deterministic key namespacing for per-ticker assessment data
//! - Background maintenance tasks (expiry sweep, stats reporting)
//! - A cache-backed request rate limiter
//! - Configuration and logging setup for the hosting process

pub mod cache;
pub mod config;
pub mod logging;
pub mod rate_limit;

pub use cache::*;
pub use config::*;
pub use logging::init_logging;
pub use rate_limit::*;
