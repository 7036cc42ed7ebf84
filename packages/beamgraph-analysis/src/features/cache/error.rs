//! Cache error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// Value could not be serialized for compressed storage
    #[error("cache serialization failed: {reason}")]
    Serialization { reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
