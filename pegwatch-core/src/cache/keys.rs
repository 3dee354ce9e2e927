//! Cache key construction
//!
//! Every key is `namespace:identifier[:qualifier]`. Tickers are normalized to
//! lower case and any delimiter they contain is escaped, so keys for
//! different logical entities never collide.

use crate::cache::tier::Tier;
use sha2::{Digest, Sha256};

/// Separator between key segments
pub const DELIMITER: char = ':';

/// Namespace for per-ticker assessment artifacts
pub const STABLECOIN_NAMESPACE: &str = "stablecoin";

/// Namespace for rate-limit window counters
pub const RATE_LIMIT_NAMESPACE: &str = "rate_limit";

/// Keys longer than this are replaced by a digest
pub const MAX_KEY_LEN: usize = 200;

/// Key for the aggregate assessment of a ticker: `stablecoin:usdc`
pub fn stablecoin_assessment(ticker: &str) -> String {
    format!("{}{}{}", STABLECOIN_NAMESPACE, DELIMITER, normalize_ticker(ticker))
}

/// Key for one tier of a ticker's data: `stablecoin:usdc:tier1`
pub fn stablecoin_tier(ticker: &str, tier: Tier) -> String {
    format!("{}{}{}", stablecoin_assessment(ticker), DELIMITER, tier)
}

/// Key for the fully merged record of a ticker: `stablecoin:usdc:full`
pub fn stablecoin_full(ticker: &str) -> String {
    format!("{}{}full", stablecoin_assessment(ticker), DELIMITER)
}

/// Key for a rate-limit counter: `rate_limit:heavy_operations_per_ip:1.2.3.4`
pub fn rate_limit(kind: &str, identifier: &str) -> String {
    format!(
        "{}{}{}{}{}",
        RATE_LIMIT_NAMESPACE,
        DELIMITER,
        escape_segment(kind),
        DELIMITER,
        escape_segment(identifier)
    )
}

/// Separator between parameter pairs in a [`namespaced`] key
const PARAM_SEPARATOR: char = '_';

/// Separator between a parameter name and its value
const PARAM_ASSIGN: char = '=';

/// Generic `namespace:identifier[:k1=v1_k2=v2]` key.
///
/// Parameters are sorted by name so argument order does not matter. The
/// identifier and every parameter name and value are escaped, so no segment
/// can forge a separator. Keys longer than [`MAX_KEY_LEN`] are collapsed to
/// `namespace:<sha256 hex>`.
pub fn namespaced(namespace: &str, identifier: &str, params: &[(&str, &str)]) -> String {
    let mut key = format!("{}{}{}", namespace, DELIMITER, escape_segment(identifier));

    if !params.is_empty() {
        let mut sorted: Vec<_> = params
            .iter()
            .map(|(k, v)| (escape_param(k), escape_param(v)))
            .collect();
        sorted.sort_unstable();
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}{}{}", k, PARAM_ASSIGN, v))
            .collect::<Vec<_>>()
            .join(&PARAM_SEPARATOR.to_string());
        key.push(DELIMITER);
        key.push_str(&joined);
    }

    if key.len() > MAX_KEY_LEN {
        let digest = Sha256::digest(key.as_bytes());
        return format!("{}{}{}", namespace, DELIMITER, hex::encode(digest));
    }

    key
}

/// Prefix shared by every key in `namespace`
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}{}", namespace, DELIMITER)
}

/// Trim, lower-case and escape a ticker symbol
pub fn normalize_ticker(ticker: &str) -> String {
    escape_segment(&ticker.trim().to_lowercase())
}

fn escape_segment(segment: &str) -> String {
    escape(segment, &[DELIMITER])
}

fn escape_param(segment: &str) -> String {
    escape(segment, &[DELIMITER, PARAM_SEPARATOR, PARAM_ASSIGN])
}

/// Percent-escape `%` and every reserved character
fn escape(segment: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == '%' || reserved.contains(&c) {
            out.push_str(&format!("%{:02x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
