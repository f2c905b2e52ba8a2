//! Error types for the service layer.
//!
//! Only the system of record can fail an operation: cache and blob
//! degradation is handled inside the services and never surfaces here,
//! except for uploads, where a lost blob would mean lost data.

use sage_core::KnowledgeFileId;
use thiserror::Error;

/// A result type using `ServiceError`.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur in service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource does not exist or is not visible to the caller.
    ///
    /// Deliberately carries no detail: "absent" and "exists but owned by
    /// someone else" must be indistinguishable to the caller.
    #[error("resource not found")]
    NotFound,

    /// The caller has exhausted the current rate-limit window.
    #[error("rate limited: {remaining} attempts remaining")]
    RateLimited {
        /// Attempts left in the window, saturating at zero.
        remaining: i64,
    },

    /// The knowledge file already left the pending state.
    #[error("knowledge file {0} is already finalized")]
    AlreadyFinalized(KnowledgeFileId),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] sage_store::StoreError),

    /// Object-store error on a non-degradable path.
    #[error("object store error: {0}")]
    Blob(#[from] sage_blob::BlobError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) | Self::AlreadyFinalized(_) => 409,
            Self::NotFound => 404,
            Self::RateLimited { .. } => 429,
            Self::Blob(_) => 502,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Blob(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ServiceError::Conflict("duplicate".to_string()).http_status_code(),
            409
        );
        assert_eq!(ServiceError::NotFound.http_status_code(), 404);
        assert_eq!(
            ServiceError::RateLimited { remaining: 0 }.http_status_code(),
            429
        );
        assert_eq!(
            ServiceError::AlreadyFinalized(KnowledgeFileId::generate()).http_status_code(),
            409
        );
        assert_eq!(
            ServiceError::Internal("boom".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn not_found_reveals_nothing() {
        assert_eq!(ServiceError::NotFound.to_string(), "resource not found");
    }
}
