//! Bearer-session service.
//!
//! Sessions are keyed by the hash of the raw token; the raw token never
//! reaches this layer in persisted form. The cached projection's TTL is
//! the session's remaining lifetime, so a cache hit can only be stale in
//! the narrow window where the entry outlives its own `expires_at`; that
//! case self-heals by deleting the entry.
//!
//! `get_session` returning `None` is the authorization-failure signal.
//! It is an absence, never an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sage_cache::{keys, CacheService, KvCache};
use sage_core::UserId;
use sage_store::{SessionRecord, Store};

use crate::error::{Result, ServiceError};
use crate::types::CachedSession;

/// Session issuance, resolution, and cleanup.
pub struct SessionService<S, C> {
    store: Arc<S>,
    cache: CacheService<C>,
}

impl<S: Store, C: KvCache> SessionService<S, C> {
    /// Create a session service.
    #[must_use]
    pub fn new(store: Arc<S>, kv: Arc<C>) -> Self {
        Self {
            store,
            cache: CacheService::new(kv),
        }
    }

    /// Issue a session for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn create_session(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Result<SessionRecord> {
        let now = Utc::now();
        let session = SessionRecord {
            token_hash: token_hash.to_string(),
            user_id,
            expires_at,
            user_agent,
            ip_address,
            is_active: true,
            created_at: now,
            last_used_at: now,
        };
        self.store.put_session(&session)?;

        if let Ok(ttl) = u64::try_from((expires_at - now).num_seconds()) {
            if ttl > 0 {
                self.cache
                    .set(
                        &keys::session(token_hash),
                        &CachedSession { user_id, expires_at },
                        ttl,
                    )
                    .await;
            }
        }

        tracing::info!(user_id = %user_id, "Created session");
        Ok(session)
    }

    /// Resolve a token hash to its user, or `None` if the session is
    /// unknown, inactive, or expired.
    ///
    /// The store path touches `last_used_at` on success; the cached path
    /// does not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_session(&self, token_hash: &str) -> Result<Option<UserId>> {
        let now = Utc::now();
        let key = keys::session(token_hash);

        if let Some(cached) = self.cache.get::<CachedSession>(&key).await {
            if cached.expires_at > now {
                return Ok(Some(cached.user_id));
            }
            self.cache.del(&key).await;
            return Ok(None);
        }

        let Some(mut session) = self.store.get_session(token_hash)? else {
            return Ok(None);
        };
        if !session.is_active || session.is_expired(now) {
            return Ok(None);
        }

        session.last_used_at = now;
        self.store.put_session(&session)?;

        Ok(Some(session.user_id))
    }

    /// Record that the session authorized a request just now.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the session does not exist, or
    /// a storage error.
    pub async fn touch_session(&self, token_hash: &str) -> Result<()> {
        let mut session = self
            .store
            .get_session(token_hash)?
            .ok_or(ServiceError::NotFound)?;
        session.last_used_at = Utc::now();
        self.store.put_session(&session)?;
        Ok(())
    }

    /// Revoke a session before its natural expiry.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the session does not exist, or
    /// a storage error.
    pub async fn invalidate_session(&self, token_hash: &str) -> Result<()> {
        let mut session = self
            .store
            .get_session(token_hash)?
            .ok_or(ServiceError::NotFound)?;
        session.is_active = false;
        self.store.put_session(&session)?;

        self.cache.del(&keys::session(token_hash)).await;

        tracing::info!(user_id = %session.user_id, "Invalidated session");
        Ok(())
    }

    /// Deactivate every active session past its expiry.
    ///
    /// Returns the number of sessions deactivated.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.store.deactivate_expired_sessions(Utc::now())?;
        if count > 0 {
            tracing::info!(count, "Deactivated expired sessions");
        }
        Ok(count)
    }
}
