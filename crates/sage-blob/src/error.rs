//! Error types for the object-store client.

use thiserror::Error;

/// A result type using `BlobError`.
pub type Result<T> = std::result::Result<T, BlobError>;

/// Errors that can occur against the object-store backend.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The request could not be sent or the response not read.
    #[error("object store request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("object store returned status {0}")]
    Status(u16),

    /// The given URL does not belong to this store.
    #[error("not an object store URL: {0}")]
    InvalidUrl(String),
}
