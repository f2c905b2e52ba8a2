//! TTL cache service and rate limiter for the sage platform.
//!
//! This crate wraps a TTL key-value backend behind the `KvCache` trait and
//! layers two facilities on top:
//!
//! - [`CacheService`]: JSON (de)serialization with swallow-and-log failure
//!   semantics. The cache is never authoritative, so a backend outage
//!   degrades to a miss or no-op and is logged, never raised.
//! - [`RateLimiter`]: a fixed-window attempt counter built on the
//!   backend's atomic increment, failing open when the backend is down.
//!
//! Cache keys are built exclusively by the [`keys`] module so every code
//! path that mutates an entity can invalidate the exact same keys its
//! readers populate.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sage_cache::{keys, CacheService, MemoryKv};
//! use sage_core::UserId;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cache = CacheService::new(Arc::new(MemoryKv::new()));
//! let user_id = UserId::generate();
//!
//! cache.set(&keys::user(&user_id), &"hello", 3600).await;
//! let cached: Option<String> = cache.get(&keys::user(&user_id)).await;
//! assert_eq!(cached.as_deref(), Some("hello"));
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod rate_limit;

pub use error::{CacheError, Result};
pub use memory::MemoryKv;
pub use rate_limit::{RateLimitAction, RateLimitDecision, RateLimitPolicy, RateLimiter};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sage_core::UserId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The TTL key-value backend contract.
///
/// This trait abstracts the cache backend, allowing different
/// implementations (in-process for tests and single-node deployments, a
/// networked store in production). Values are opaque strings; expiry and
/// atomic increment are backend responsibilities.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Get the value for a key, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under a key with the given time-to-live.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove a key. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn del(&self, key: &str) -> Result<()>;

    /// Atomically increment the integer counter under a key.
    ///
    /// An absent or expired key counts from zero, so the first increment
    /// returns 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set the time-to-live of an existing key.
    ///
    /// Returns `false` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}

/// Deterministic cache key construction.
///
/// Keys are lowercase and colon-separated; every entity-derived key is a
/// pure function of entity type and id.
pub mod keys {
    use sage_core::UserId;

    /// `user:{id}` — user record including nested assistant summary.
    #[must_use]
    pub fn user(user_id: &UserId) -> String {
        format!("user:{user_id}")
    }

    /// `user:email:{email}` — user record keyed by lowercased email.
    #[must_use]
    pub fn user_email(email: &str) -> String {
        format!("user:email:{}", email.to_lowercase())
    }

    /// `user:{id}:ais` — active custom-assistant list.
    #[must_use]
    pub fn user_ais(user_id: &UserId) -> String {
        format!("user:{user_id}:ais")
    }

    /// `user:{id}:conversations` — active conversation list with previews.
    #[must_use]
    pub fn user_conversations(user_id: &UserId) -> String {
        format!("user:{user_id}:conversations")
    }

    /// `user:{id}:rag_instances` — active retrieval-index instance list.
    #[must_use]
    pub fn user_rag_instances(user_id: &UserId) -> String {
        format!("user:{user_id}:rag_instances")
    }

    /// `session:{tokenHash}` — cached session projection.
    #[must_use]
    pub fn session(token_hash: &str) -> String {
        format!("session:{token_hash}")
    }

    /// `rate_limit:{action}:{identity}` — fixed-window attempt counter.
    #[must_use]
    pub fn rate_limit(action: &str, identity: &str) -> String {
        format!("rate_limit:{}:{}", action.to_lowercase(), identity.to_lowercase())
    }

    /// `failed_attempts:{identity}` — last-failure timestamp marker.
    #[must_use]
    pub fn failed_attempts(identity: &str) -> String {
        format!("failed_attempts:{}", identity.to_lowercase())
    }
}

/// JSON cache wrapper with swallow-and-log failure semantics.
///
/// None of the methods can fail from the caller's perspective: the cache
/// is a latency optimization, and correctness always comes from the
/// system of record. Backend and serialization failures are logged at
/// `warn` and degrade to a miss (`get`) or a no-op (`set`/`del`).
pub struct CacheService<C> {
    kv: Arc<C>,
}

impl<C> Clone for CacheService<C> {
    fn clone(&self) -> Self {
        Self { kv: Arc::clone(&self.kv) }
    }
}

impl<C: KvCache> CacheService<C> {
    /// Create a cache service over the given backend.
    #[must_use]
    pub fn new(kv: Arc<C>) -> Self {
        Self { kv }
    }

    /// Get a reference to the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<C> {
        &self.kv
    }

    /// Serialize and store a value with the given TTL in seconds.
    ///
    /// Returns `false` (and logs) on any failure.
    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache set failed to serialize");
                return false;
            }
        };

        match self.kv.set(key, payload, Duration::from_secs(ttl_secs)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Fetch and deserialize a value.
    ///
    /// Returns `None` (and logs) on any failure; an undeserializable
    /// entry is treated as a miss, since the authoritative read path will
    /// repopulate it.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match self.kv.get(key).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache get failed");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache entry failed to deserialize");
                None
            }
        }
    }

    /// Delete a key.
    ///
    /// Returns `false` (and logs) on failure.
    pub async fn del(&self, key: &str) -> bool {
        match self.kv.del(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Delete the fixed set of keys namespaced to a user.
    ///
    /// Covers the profile, assistant list, conversation list, and
    /// retrieval-index list entries.
    pub async fn invalidate_user_cache(&self, user_id: &UserId) {
        for key in [
            keys::user(user_id),
            keys::user_ais(user_id),
            keys::user_conversations(user_id),
            keys::user_rag_instances(user_id),
        ] {
            self.del(&key).await;
        }
    }
}
