//! Property-based tests for cache semantics
//!
//! - read-after-write for any key, JSON value and positive TTL
//! - a first lookup is always a miss
//! - the hit ratio equals hits / (hits + misses) for any access pattern
//! - ticker keys are case-insensitive and never collide across entity kinds

use pegwatch_core::cache::keys;
use pegwatch_core::{CacheError, Tier, TieredCache};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:_]{1,40}"
}

/// Strategy for JSON payloads shaped like assessment records
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,32}".prop_map(Value::from),
        (any::<u8>(), "[a-z]{1,8}").prop_map(|(score, ticker)| json!({"ticker": ticker, "score": score})),
    ]
}

/// Strategy for ticker symbols, including mixed case and delimiters
fn ticker_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9:%]{1,12}"
}

proptest! {
    #[test]
    fn prop_read_after_write(key in key_strategy(), value in value_strategy(), ttl in 1u64..100_000) {
        let cache = TieredCache::new();
        cache.set(key.as_str(), value.clone(), ttl);

        prop_assert_eq!(cache.get(&key), Some(value));
        prop_assert_eq!(cache.metrics().hits(), 1);
        prop_assert_eq!(cache.metrics().sets(), 1);
    }

    #[test]
    fn prop_first_lookup_is_miss(key in key_strategy()) {
        let cache = TieredCache::new();

        prop_assert_eq!(cache.get(&key), None);
        prop_assert_eq!(cache.metrics().misses(), 1);
        prop_assert_eq!(cache.metrics().hits(), 0);
    }

    #[test]
    fn prop_hit_ratio(pattern in prop::collection::vec(any::<bool>(), 0..64)) {
        let cache = TieredCache::new();
        cache.set("present", json!(1), 60);

        for &hit in &pattern {
            let key = if hit { "present" } else { "absent" };
            cache.get(key);
        }

        let hits = pattern.iter().filter(|&&h| h).count() as u64;
        let misses = pattern.len() as u64 - hits;
        let stats = cache.stats();

        prop_assert_eq!(stats.metrics.hits, hits);
        prop_assert_eq!(stats.metrics.misses, misses);
        if pattern.is_empty() {
            prop_assert_eq!(stats.hit_ratio, 0.0);
        } else {
            prop_assert_eq!(stats.hit_ratio, hits as f64 / (hits + misses) as f64);
        }
    }

    #[test]
    fn prop_ticker_keys_case_insensitive(ticker in ticker_strategy()) {
        let upper = ticker.to_uppercase();
        let lower = ticker.to_lowercase();

        prop_assert_eq!(keys::stablecoin_assessment(&upper), keys::stablecoin_assessment(&lower));
        prop_assert_eq!(keys::stablecoin_full(&upper), keys::stablecoin_full(&lower));
        prop_assert_eq!(
            keys::stablecoin_tier(&upper, Tier::Market),
            keys::stablecoin_tier(&lower, Tier::Market)
        );
    }

    #[test]
    fn prop_ticker_keys_never_collide(a in ticker_strategy(), b in ticker_strategy()) {
        // Keys for different entity kinds are distinct even across tickers
        prop_assert_ne!(keys::stablecoin_assessment(&a), keys::stablecoin_full(&b));
        for tier in Tier::ALL {
            prop_assert_ne!(keys::stablecoin_assessment(&a), keys::stablecoin_tier(&b, tier));
            prop_assert_ne!(keys::stablecoin_full(&a), keys::stablecoin_tier(&b, tier));
        }
    }

    #[test]
    fn prop_invalid_tier_rejected(tier in 4u8..=255) {
        let cache = TieredCache::new();

        let result = cache.set_for_tier("key", json!(1), tier);
        prop_assert!(matches!(result, Err(CacheError::InvalidTier(t)) if t == tier));
        prop_assert!(matches!(
            cache.set_for_tier("key", json!(1), 0),
            Err(CacheError::InvalidTier(0))
        ));
        prop_assert!(cache.is_empty());
        prop_assert_eq!(cache.metrics().sets(), 0);
    }
}
