//! Error types for the cache layer.
//!
//! These errors stay inside the crate: `CacheService` swallows them and
//! degrades to a miss or no-op, because the cache is never authoritative.

use thiserror::Error;

/// A result type using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur against the cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend is unreachable or failed.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Serialization or deserialization of a cached value failed.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}
