//! Cache error types

/// Errors surfaced by cache operations
///
/// A lookup miss is not an error; it is reported as `None`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache tier {0}: expected 1, 2 or 3")]
    InvalidTier(u8),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache entry {0} does not hold an integer counter")]
    NotACounter(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
