//! Object-store client for sage knowledge and index artifacts.
//!
//! This crate abstracts the blob backend behind the [`ObjectStore`]
//! trait: named byte blobs go in, durable fetch URLs come out. Two
//! implementations are provided:
//!
//! - [`HttpObjectStore`]: speaks a simple PUT/DELETE/list protocol to a
//!   hosted blob service over HTTP.
//! - [`MemoryObjectStore`]: an in-process double for tests, with
//!   switchable delete failures to exercise degraded paths.
//!
//! The store is not authoritative for anything; callers that can degrade
//! (deletes during instance teardown, listings) swallow errors and log.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod http;
pub mod memory;
pub mod paths;

pub use error::{BlobError, Result};
pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;

/// Metadata for one stored blob, as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlobInfo {
    /// Store path of the blob.
    pub path: String,
    /// Durable fetch URL.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
}

/// The object-store contract: named byte blobs with durable URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a blob under the given path, returning its durable URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails; uploads are never silently
    /// dropped.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete a blob by its durable URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails or the URL does not belong
    /// to this store.
    async fn delete(&self, url: &str) -> Result<()>;

    /// List blobs under a path prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>>;
}
