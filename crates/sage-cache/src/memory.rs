//! In-process TTL key-value backend.
//!
//! This module provides `MemoryKv`, an in-memory implementation of the
//! `KvCache` trait with per-key expiry and atomic increment. Entries are
//! expired lazily on access; a missing or expired key behaves identically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::KvCache;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// An in-memory TTL key-value store.
///
/// All operations take one lock; `incr` is atomic with respect to
/// concurrent callers, which is what the fixed-window rate limiter
/// depends on.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKv {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries. Test/diagnostic helper.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the backend holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvCache for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();

        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Lazily drop the expired entry
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.value.parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;

        // A fresh counter carries no expiry until `expire` is called,
        // matching the INCR/EXPIRE pairing of the rate limiter
        let expires_at = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.expires_at,
            _ => None,
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );

        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get() {
        let kv = MemoryKv::new();

        kv.set("k", "v".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));
        assert!(kv.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_expire() {
        let kv = MemoryKv::new();

        kv.set("k", "v".to_string(), Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(kv.get("k").await.unwrap().is_none());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let kv = MemoryKv::new();

        kv.set("k", "v".to_string(), Duration::from_secs(60)).await.unwrap();
        kv.del("k").await.unwrap();

        assert!(kv.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn incr_counts_from_one() {
        let kv = MemoryKv::new();

        assert_eq!(kv.incr("counter").await.unwrap(), 1);
        assert_eq!(kv.incr("counter").await.unwrap(), 2);
        assert_eq!(kv.incr("counter").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incr_resets_after_expiry() {
        let kv = MemoryKv::new();

        kv.incr("counter").await.unwrap();
        assert!(kv.expire("counter", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(kv.incr("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expire_on_missing_key_is_false() {
        let kv = MemoryKv::new();
        assert!(!kv.expire("missing", Duration::from_secs(1)).await.unwrap());
    }
}
