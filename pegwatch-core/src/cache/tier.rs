//! Freshness tiers and their TTL policy

use crate::cache::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const HOUR: u64 = 3600;

/// TTL applied to callers that do not pick a tier
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * HOUR);

/// Freshness class of a cached assessment artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// Slow-changing identity and metadata
    Metadata = 1,
    /// Medium-volatility risk factors
    RiskFactors = 2,
    /// Fast-changing market data
    Market = 3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Metadata, Tier::RiskFactors, Tier::Market];

    /// Time-to-live for entries stored in this tier
    pub const fn ttl(self) -> Duration {
        match self {
            Tier::Metadata => Duration::from_secs(24 * HOUR),
            Tier::RiskFactors => Duration::from_secs(12 * HOUR),
            Tier::Market => Duration::from_secs(6 * HOUR),
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tier {
    type Error = CacheError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::Metadata),
            2 => Ok(Tier::RiskFactors),
            3 => Ok(Tier::Market),
            other => Err(CacheError::InvalidTier(other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ttls() {
        assert_eq!(Tier::Metadata.ttl(), Duration::from_secs(86_400));
        assert_eq!(Tier::RiskFactors.ttl(), Duration::from_secs(43_200));
        assert_eq!(Tier::Market.ttl(), Duration::from_secs(21_600));
        assert_eq!(DEFAULT_TTL, Tier::Metadata.ttl());
    }

    #[test]
    fn test_tier_from_u8() {
        for tier in Tier::ALL {
            assert_eq!(Tier::try_from(tier.as_u8()).unwrap(), tier);
        }

        for invalid in [0u8, 4, 255] {
            match Tier::try_from(invalid) {
                Err(CacheError::InvalidTier(t)) => assert_eq!(t, invalid),
                other => panic!("expected InvalidTier, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Market.to_string(), "tier3");
    }

    #[test]
    fn test_tier_serde_uses_number() {
        assert_eq!(serde_json::to_string(&Tier::RiskFactors).unwrap(), "2");
        let tier: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, Tier::Market);
        assert!(serde_json::from_str::<Tier>("7").is_err());
    }
}
