//! In-memory object store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{BlobError, Result};
use crate::{BlobInfo, ObjectStore};

const URL_SCHEME: &str = "memory://";

/// An in-process object store double.
///
/// Durable URLs use a `memory://` scheme. Deletes can be switched to
/// fail, so callers' degraded paths (best-effort blob cleanup) can be
/// exercised; the delete attempt is still recorded either way.
#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    deleted: RwLock<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryObjectStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `delete` calls fail (or succeed again).
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Whether a blob exists for the given durable URL.
    #[must_use]
    pub fn contains_url(&self, url: &str) -> bool {
        match url.strip_prefix(URL_SCHEME) {
            Some(path) => self.blobs.read().contains_key(path),
            None => false,
        }
    }

    /// URLs whose deletion has been attempted, in order.
    #[must_use]
    pub fn delete_attempts(&self) -> Vec<String> {
        self.deleted.read().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        self.blobs.write().insert(path.to_string(), bytes);
        Ok(format!("{URL_SCHEME}{path}"))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| BlobError::InvalidUrl(url.to_string()))?;

        self.deleted.write().push(url.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Request("simulated outage".to_string()));
        }

        self.blobs.write().remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let blobs = self.blobs.read();
        let mut infos: Vec<BlobInfo> = blobs
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, bytes)| BlobInfo {
                path: path.clone(),
                url: format!("{URL_SCHEME}{path}"),
                size: bytes.len() as u64,
            })
            .collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(infos)
    }
}
