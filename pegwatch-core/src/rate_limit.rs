//! Per-client request rate limiting backed by the result cache
//!
//! Each (limit kind, client) pair owns a counter entry in the cache whose TTL
//! is the window length. The first request of a window creates the counter;
//! it disappears with the window.

use crate::cache::{keys, TieredCache};
use crate::config::RateLimitSettings;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

/// Route prefixes for resource-intensive operations
const HEAVY_OPERATION_PREFIXES: &[&str] = &[
    "/api/v1/risk/assessment",
    "/api/v1/risk/comparison",
    "/api/v1/github/analyze-repository",
    "/api/v1/github/analyze-repositories",
    "/api/v1/liquidity/comprehensive-analysis",
];

/// Route prefixes for risk analysis
const RISK_ASSESSMENT_PREFIXES: &[&str] = &[
    "/api/v1/risk/assessment",
    "/api/v1/risk/summary",
    "/api/v1/risk/factors",
    "/api/v1/risk/comparison",
];

/// Route prefixes exempt from limiting
const WHITELIST_PREFIXES: &[&str] = &[
    "/docs",
    "/redoc",
    "/openapi.json",
    "/health",
    "/api/v1/risk/health",
    "/api/v1/github/health",
    "/api/v1/liquidity/health",
    "/api/v1/risk/models/weights",
];

/// Category of request, each with its own limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    ApiCalls,
    RiskAssessments,
    HeavyOperations,
}

impl LimitKind {
    pub const ALL: [LimitKind; 3] = [
        LimitKind::ApiCalls,
        LimitKind::RiskAssessments,
        LimitKind::HeavyOperations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LimitKind::ApiCalls => "api_calls_per_ip",
            LimitKind::RiskAssessments => "risk_assessments_per_ip",
            LimitKind::HeavyOperations => "heavy_operations_per_ip",
        }
    }

    /// Classify a request path, most restrictive category first
    pub fn for_path(path: &str) -> Self {
        if HEAVY_OPERATION_PREFIXES.iter().any(|p| path.starts_with(p)) {
            LimitKind::HeavyOperations
        } else if RISK_ASSESSMENT_PREFIXES.iter().any(|p| path.starts_with(p)) {
            LimitKind::RiskAssessments
        } else {
            LimitKind::ApiCalls
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub kind: LimitKind,
    pub allowed: bool,
    /// Requests counted in the current window
    pub current: u64,
    pub limit: u32,
    pub remaining: u32,
    /// When the current window ends, if one is open
    pub reset_at: Option<DateTime<Utc>>,
    pub window_secs: u64,
}

/// Aggregate limiter counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStats {
    pub enabled: bool,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub block_rate_percent: f64,
    pub unique_blocked_identifiers: usize,
}

/// Fixed-window request limiter keyed by client identifier
pub struct RateLimiter {
    cache: Arc<TieredCache>,
    settings: RateLimitSettings,
    total_requests: AtomicU64,
    blocked_requests: AtomicU64,
    /// Identifiers blocked in a still-open window, with that window's end
    blocked_identifiers: DashMap<String, DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(cache: Arc<TieredCache>, settings: RateLimitSettings) -> Self {
        Self {
            cache,
            settings,
            total_requests: AtomicU64::new(0),
            blocked_requests: AtomicU64::new(0),
            blocked_identifiers: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// Whether `path` bypasses rate limiting
    pub fn is_whitelisted(path: &str) -> bool {
        WHITELIST_PREFIXES.iter().any(|p| path.starts_with(p))
    }

    /// Count a request to `path` from `identifier`; `None` when the path is
    /// exempt
    pub fn check_path(&self, path: &str, identifier: &str) -> Option<RateLimitDecision> {
        if Self::is_whitelisted(path) {
            return None;
        }
        Some(self.check(LimitKind::for_path(path), identifier))
    }

    /// Count one request of `kind` from `identifier` and decide whether it
    /// may proceed
    pub fn check(&self, kind: LimitKind, identifier: &str) -> RateLimitDecision {
        let rule = self.settings.rule(kind);
        if !self.settings.enabled {
            return self.decision(kind, 0, true, None);
        }

        let key = keys::rate_limit(kind.as_str(), identifier);
        let current = match self.cache.increment(&key, 1, rule.window()) {
            Ok(count) => count.max(0) as u64,
            Err(e) => {
                // Fail open
                error!("Rate limit check error for {}: {}", key, e);
                return self.decision(kind, 0, true, None);
            }
        };

        let allowed = current <= u64::from(rule.limit);
        let reset_at = self.cache.expires_at(&key);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if !allowed {
            self.blocked_requests.fetch_add(1, Ordering::Relaxed);
            self.record_blocked(identifier, reset_at.unwrap_or_else(Utc::now));
            warn!(
                "Rate limit exceeded for {}: type={}, current={}, limit={}",
                identifier, kind, current, rule.limit
            );
        }

        self.decision(kind, current, allowed, reset_at)
    }

    /// Report the state of `identifier`'s window without counting a request
    pub fn status(&self, kind: LimitKind, identifier: &str) -> RateLimitDecision {
        let key = keys::rate_limit(kind.as_str(), identifier);
        let current = self.cache.peek_counter(&key).max(0) as u64;
        let allowed = current < u64::from(self.settings.rule(kind).limit);
        self.decision(kind, current, allowed, self.cache.expires_at(&key))
    }

    /// Aggregate counters; `unique_blocked_identifiers` counts clients
    /// blocked in a window that is still open
    pub fn stats(&self) -> RateLimitStats {
        self.prune_blocked(Utc::now());
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let blocked_requests = self.blocked_requests.load(Ordering::Relaxed);
        let block_rate_percent = if total_requests == 0 {
            0.0
        } else {
            blocked_requests as f64 / total_requests as f64 * 100.0
        };

        RateLimitStats {
            enabled: self.settings.enabled,
            total_requests,
            blocked_requests,
            block_rate_percent,
            unique_blocked_identifiers: self.blocked_identifiers.len(),
        }
    }

    /// Remember `identifier` as blocked until `until`, dropping identifiers
    /// whose windows have all closed
    fn record_blocked(&self, identifier: &str, until: DateTime<Utc>) {
        self.prune_blocked(Utc::now());
        self.blocked_identifiers
            .entry(identifier.to_string())
            .and_modify(|end| *end = (*end).max(until))
            .or_insert(until);
    }

    fn prune_blocked(&self, now: DateTime<Utc>) {
        self.blocked_identifiers.retain(|_, until| *until > now);
    }

    fn decision(
        &self,
        kind: LimitKind,
        current: u64,
        allowed: bool,
        reset_at: Option<DateTime<Utc>>,
    ) -> RateLimitDecision {
        let rule = self.settings.rule(kind);
        let remaining = u64::from(rule.limit).saturating_sub(current) as u32;

        RateLimitDecision {
            kind,
            allowed,
            current,
            limit: rule.limit,
            remaining,
            reset_at,
            window_secs: rule.window_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitRule;
    use serde_json::json;

    fn limiter(limit: u32) -> RateLimiter {
        let rule = RateLimitRule {
            limit,
            window_secs: 3600,
        };
        let settings = RateLimitSettings {
            enabled: true,
            api_calls: rule,
            risk_assessments: rule,
            heavy_operations: rule,
        };
        RateLimiter::new(Arc::new(TieredCache::new()), settings)
    }

    #[test]
    fn test_path_classification() {
        assert_eq!(
            LimitKind::for_path("/api/v1/risk/assessment/usdc"),
            LimitKind::HeavyOperations
        );
        assert_eq!(LimitKind::for_path("/api/v1/risk/summary"), LimitKind::RiskAssessments);
        assert_eq!(LimitKind::for_path("/api/v1/coins"), LimitKind::ApiCalls);

        assert!(RateLimiter::is_whitelisted("/health"));
        assert!(RateLimiter::is_whitelisted("/api/v1/risk/health"));
        assert!(!RateLimiter::is_whitelisted("/api/v1/risk/summary"));
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = limiter(3);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check(LimitKind::ApiCalls, "10.0.0.1");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(decision.reset_at.is_some());
        }

        let blocked = limiter.check(LimitKind::ApiCalls, "10.0.0.1");
        assert!(!blocked.allowed);
        assert_eq!(blocked.current, 4);
        assert_eq!(blocked.remaining, 0);

        // Other clients and other kinds have their own windows
        assert!(limiter.check(LimitKind::ApiCalls, "10.0.0.2").allowed);
        assert!(limiter.check(LimitKind::HeavyOperations, "10.0.0.1").allowed);

        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 6);
        assert_eq!(stats.blocked_requests, 1);
        assert_eq!(stats.unique_blocked_identifiers, 1);
    }

    #[test]
    fn test_status_does_not_count() {
        let limiter = limiter(2);

        let status = limiter.status(LimitKind::RiskAssessments, "client");
        assert_eq!(status.current, 0);
        assert!(status.allowed);
        assert!(status.reset_at.is_none());

        limiter.check(LimitKind::RiskAssessments, "client");
        limiter.check(LimitKind::RiskAssessments, "client");

        let status = limiter.status(LimitKind::RiskAssessments, "client");
        assert_eq!(status.current, 2);
        // The next request would exceed the limit
        assert!(!status.allowed);
        assert_eq!(limiter.stats().total_requests, 2);
    }

    #[test]
    fn test_check_path_skips_whitelist() {
        let limiter = limiter(1);
        assert!(limiter.check_path("/docs", "client").is_none());

        let decision = limiter.check_path("/api/v1/github/analyze-repository", "client").unwrap();
        assert_eq!(decision.kind, LimitKind::HeavyOperations);
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let mut settings = RateLimitSettings::default();
        settings.enabled = false;
        let limiter = RateLimiter::new(Arc::new(TieredCache::new()), settings);

        for _ in 0..10 {
            assert!(limiter.check(LimitKind::HeavyOperations, "client").allowed);
        }
        assert_eq!(limiter.stats().total_requests, 0);
    }

    #[test]
    fn test_corrupt_counter_fails_open() {
        let cache = Arc::new(TieredCache::new());
        let limiter = RateLimiter::new(cache.clone(), RateLimitSettings::default());
        cache.set(keys::rate_limit("api_calls_per_ip", "client"), json!("garbage"), 60);

        assert!(limiter.check(LimitKind::ApiCalls, "client").allowed);
    }

    #[test]
    fn test_blocked_identifiers_expire_with_window() {
        let rule = RateLimitRule {
            limit: 1,
            window_secs: 1,
        };
        let settings = RateLimitSettings {
            enabled: true,
            api_calls: rule,
            risk_assessments: rule,
            heavy_operations: rule,
        };
        let limiter = RateLimiter::new(Arc::new(TieredCache::new()), settings);

        for client in ["a", "b"] {
            limiter.check(LimitKind::ApiCalls, client);
            assert!(!limiter.check(LimitKind::ApiCalls, client).allowed);
        }
        assert_eq!(limiter.stats().unique_blocked_identifiers, 2);

        std::thread::sleep(std::time::Duration::from_millis(1100));

        let stats = limiter.stats();
        assert_eq!(stats.unique_blocked_identifiers, 0);
        // Lifetime counters are kept
        assert_eq!(stats.blocked_requests, 2);
        assert!(limiter.check(LimitKind::ApiCalls, "a").allowed);
    }
}
