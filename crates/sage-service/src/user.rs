//! User account service.
//!
//! Registration enforces the unique-email invariant through the store's
//! insert path and is rate limited per email. Reads are cache-aside: the
//! by-email path warms both the email key and the id key, the by-id path
//! returns a profile enriched with assistant summaries and counts.

use std::sync::Arc;

use chrono::Utc;
use sage_cache::{keys, CacheService, KvCache, RateLimitAction, RateLimitPolicy, RateLimiter};
use sage_core::{digest, UserId};
use sage_store::{Store, StoreError, SubscriptionType, User};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::types::{AssistantBrief, PublicUser, UserProfile};

/// Account registration and lookup.
pub struct UserService<S, C> {
    store: Arc<S>,
    cache: CacheService<C>,
    limiter: RateLimiter<C>,
    config: ServiceConfig,
}

impl<S: Store, C: KvCache> UserService<S, C> {
    /// Create a user service with the default rate-limit policy.
    #[must_use]
    pub fn new(store: Arc<S>, kv: Arc<C>, config: ServiceConfig) -> Self {
        Self::with_rate_limit_policy(store, kv, config, RateLimitPolicy::default())
    }

    /// Create a user service with an explicit rate-limit policy.
    #[must_use]
    pub fn with_rate_limit_policy(
        store: Arc<S>,
        kv: Arc<C>,
        config: ServiceConfig,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            store,
            cache: CacheService::new(Arc::clone(&kv)),
            limiter: RateLimiter::new(kv, policy),
            config,
        }
    }

    /// Register a new account, counting the attempt against the
    /// registration rate limit for this email.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::RateLimited` when the window is exhausted,
    /// `ServiceError::Conflict` on a duplicate email, or a storage error.
    pub async fn register_user(&self, email: &str, name: &str) -> Result<PublicUser> {
        let decision = self.limiter.check(RateLimitAction::Register, email).await;
        if !decision.allowed {
            return Err(ServiceError::RateLimited {
                remaining: decision.remaining,
            });
        }

        self.create_user(email, name).await
    }

    /// Create a new account without touching the rate limiter.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the email is already taken, or
    /// a storage error.
    pub async fn create_user(&self, email: &str, name: &str) -> Result<PublicUser> {
        let now = Utc::now();
        let user = User {
            user_id: UserId::generate(),
            email: email.to_string(),
            name: name.to_string(),
            email_hash: digest::email_hash(email),
            subscription: SubscriptionType::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_user(&user).map_err(|e| match e {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => other.into(),
        })?;

        let profile = UserProfile {
            user_id: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            email_hash: user.email_hash.clone(),
            subscription: user.subscription,
            created_at: user.created_at,
            updated_at: user.updated_at,
            ais: Vec::new(),
            conversation_count: 0,
        };
        self.cache
            .set(&keys::user(&user.user_id), &profile, self.config.user_ttl_secs)
            .await;

        tracing::info!(
            user_id = %user.user_id,
            email_hash = %user.email_hash,
            "Created user"
        );

        Ok(PublicUser::from(&user))
    }

    /// Look up an active user by email.
    ///
    /// A hit warms both the email key and the id key, so the follow-up
    /// by-id read is served from cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<PublicUser>> {
        let email_key = keys::user_email(email);
        if let Some(cached) = self.cache.get::<PublicUser>(&email_key).await {
            return Ok(Some(cached));
        }

        let Some(user) = self.store.get_user_by_email(email)? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let public = PublicUser::from(&user);
        self.cache
            .set(&email_key, &public, self.config.user_ttl_secs)
            .await;

        let profile = self.build_profile(&user)?;
        self.cache
            .set(&keys::user(&user.user_id), &profile, self.config.user_ttl_secs)
            .await;

        Ok(Some(public))
    }

    /// Look up an active user by id, enriched with assistant summaries
    /// and the active conversation count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let key = keys::user(user_id);
        if let Some(cached) = self.cache.get::<UserProfile>(&key).await {
            return Ok(Some(cached));
        }

        let Some(user) = self.store.get_user(user_id)? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let profile = self.build_profile(&user)?;
        self.cache
            .set(&key, &profile, self.config.user_ttl_secs)
            .await;

        Ok(Some(profile))
    }

    /// Bump the user's `updated_at` and drop their cached profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist, or a
    /// storage error.
    pub async fn update_user_last_seen(&self, user_id: &UserId) -> Result<()> {
        let mut user = self.store.get_user(user_id)?.ok_or(ServiceError::NotFound)?;
        user.updated_at = Utc::now();
        self.store.put_user(&user)?;

        self.cache.del(&keys::user(user_id)).await;
        Ok(())
    }

    /// Count a login attempt against the email's login rate limit.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::RateLimited` when the window is exhausted.
    pub async fn check_login(&self, email: &str) -> Result<()> {
        let decision = self.limiter.check(RateLimitAction::Login, email).await;
        if decision.allowed {
            Ok(())
        } else {
            Err(ServiceError::RateLimited {
                remaining: decision.remaining,
            })
        }
    }

    /// Record a failed login for this email. Informational only.
    pub async fn record_failed_login(&self, email: &str) {
        self.limiter.record_failed_attempt(email).await;
    }

    fn build_profile(&self, user: &User) -> Result<UserProfile> {
        let mut ais: Vec<AssistantBrief> = self
            .store
            .list_ais_by_user(&user.user_id)?
            .iter()
            .filter(|ai| ai.is_active)
            .map(AssistantBrief::from)
            .collect();
        ais.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let conversation_count = self
            .store
            .list_conversations_by_user(&user.user_id)?
            .iter()
            .filter(|c| c.is_active)
            .count() as u64;

        Ok(UserProfile {
            user_id: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            email_hash: user.email_hash.clone(),
            subscription: user.subscription,
            created_at: user.created_at,
            updated_at: user.updated_at,
            ais,
            conversation_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_cache::MemoryKv;
    use sage_store::RocksStore;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<RocksStore>, Arc<MemoryKv>, UserService<RocksStore, MemoryKv>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let kv = Arc::new(MemoryKv::new());
        let service = UserService::new(
            Arc::clone(&store),
            Arc::clone(&kv),
            ServiceConfig::default(),
        );
        (dir, store, kv, service)
    }

    #[tokio::test]
    async fn registers_and_reads_back() {
        let (_dir, _store, _kv, service) = fixture();

        let created = service.register_user("ann@example.com", "Ann").await.unwrap();
        assert_eq!(created.email, "ann@example.com");
        assert_eq!(created.subscription, SubscriptionType::Free);
        assert_eq!(created.email_hash.len(), 12);

        let by_email = service.get_user_by_email("ann@example.com").await.unwrap();
        assert_eq!(by_email, Some(created.clone()));

        let profile = service.get_user_by_id(&created.user_id).await.unwrap().unwrap();
        assert_eq!(profile.email, "ann@example.com");
        assert!(profile.ais.is_empty());
        assert_eq!(profile.conversation_count, 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (_dir, _store, _kv, service) = fixture();

        service.create_user("ann@example.com", "Ann").await.unwrap();
        let err = service.create_user("ann@example.com", "Other").await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.http_status_code(), 409);
    }

    #[tokio::test]
    async fn registration_is_rate_limited_per_email() {
        let (_dir, _store, _kv, service) = fixture();

        // Five failed attempts against the same email exhaust the window
        for _ in 0..5 {
            let _ = service.register_user("ann@example.com", "Ann").await;
        }

        let err = service.register_user("ann@example.com", "Ann").await.unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { remaining: 0 }));
        assert_eq!(err.http_status_code(), 429);

        // A different email is unaffected
        service.register_user("bea@example.com", "Bea").await.unwrap();
    }

    #[tokio::test]
    async fn deactivated_user_is_hidden() {
        let (_dir, store, _kv, service) = fixture();

        let created = service.create_user("ann@example.com", "Ann").await.unwrap();

        let mut row = store.get_user(&created.user_id).unwrap().unwrap();
        row.is_active = false;
        store.put_user(&row).unwrap();

        assert_eq!(service.get_user_by_email("ann@example.com").await.unwrap(), None);
        // Cached profile from creation still serves until it is invalidated;
        // drop it and the store path takes over.
        service.cache.del(&keys::user(&created.user_id)).await;
        assert!(service.get_user_by_id(&created.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_lookup_warms_the_id_key() {
        let (_dir, _store, kv, service) = fixture();

        let created = service.create_user("ann@example.com", "Ann").await.unwrap();
        service.cache.del(&keys::user(&created.user_id)).await;

        service.get_user_by_email("ann@example.com").await.unwrap();

        let warmed = kv.get(&keys::user(&created.user_id)).await.unwrap();
        assert!(warmed.is_some());
    }

    #[tokio::test]
    async fn last_seen_bumps_and_invalidates() {
        let (_dir, store, kv, service) = fixture();

        let created = service.create_user("ann@example.com", "Ann").await.unwrap();
        service.update_user_last_seen(&created.user_id).await.unwrap();

        let row = store.get_user(&created.user_id).unwrap().unwrap();
        assert!(row.updated_at > row.created_at);

        let cached = kv.get(&keys::user(&created.user_id)).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn missing_user_last_seen_is_not_found() {
        let (_dir, _store, _kv, service) = fixture();

        let err = service.update_user_last_seen(&UserId::generate()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }
}
