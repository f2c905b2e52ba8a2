//! Fixed-window rate limiting over the cache backend.
//!
//! The limiter is an abuse mitigation, not a security boundary: when the
//! counter backend is unreachable it fails open, preferring availability
//! over strict enforcement. The fixed window permits brief bursts at
//! window boundaries (up to twice the limit in the worst case); this is
//! accepted behavior.

use std::sync::Arc;
use std::time::Duration;

use crate::{keys, KvCache};

/// Authentication actions subject to rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    /// Login attempts.
    Login,
    /// Registration attempts.
    Register,
}

impl RateLimitAction {
    /// The key-scheme name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

/// Limit and window configuration for the limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum allowed attempts per window.
    pub limit: i64,
    /// Window length; the counter expires and resets after this.
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    /// 5 attempts per 15 minutes per (identity, action) pair.
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(900),
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the attempt may proceed.
    pub allowed: bool,
    /// Attempts left in the current window, saturating at zero.
    pub remaining: i64,
}

/// Fixed-window attempt counter per (identity, action) pair.
pub struct RateLimiter<C> {
    kv: Arc<C>,
    policy: RateLimitPolicy,
}

impl<C: KvCache> RateLimiter<C> {
    /// Create a limiter over the given backend with the given policy.
    #[must_use]
    pub fn new(kv: Arc<C>, policy: RateLimitPolicy) -> Self {
        Self { kv, policy }
    }

    /// Create a limiter with the default 5-per-900s policy.
    #[must_use]
    pub fn with_defaults(kv: Arc<C>) -> Self {
        Self::new(kv, RateLimitPolicy::default())
    }

    /// Get the configured policy.
    #[must_use]
    pub const fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count an attempt and decide whether it may proceed.
    ///
    /// The first increment in a window arms the key's expiry to the
    /// window length. A backend failure fails open with the full limit
    /// reported as remaining.
    pub async fn check(&self, action: RateLimitAction, identity: &str) -> RateLimitDecision {
        let key = keys::rate_limit(action.as_str(), identity);

        let current = match self.kv.incr(&key).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(key, error = %e, "Rate limit check failed, allowing request");
                return RateLimitDecision {
                    allowed: true,
                    remaining: self.policy.limit,
                };
            }
        };

        if current == 1 {
            if let Err(e) = self.kv.expire(&key, self.policy.window).await {
                tracing::warn!(key, error = %e, "Failed to arm rate limit window");
            }
        }

        RateLimitDecision {
            allowed: current <= self.policy.limit,
            remaining: (self.policy.limit - current).max(0),
        }
    }

    /// Record a timestamped failed-attempt marker for an identity.
    ///
    /// Informational only; nothing enforces against this key. Failures
    /// are logged and ignored.
    pub async fn record_failed_attempt(&self, identity: &str) {
        let key = keys::failed_attempts(identity);
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();

        if let Err(e) = self.kv.set(&key, timestamp, Duration::from_secs(3600)).await {
            tracing::warn!(key, error = %e, "Failed to record failed attempt");
        }
    }
}
