//! Service configuration.

/// Tunable knobs shared by the services.
///
/// All TTLs are in seconds. The defaults match production behavior; tests
/// override individual fields as needed.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// TTL of cached user profiles (`user:{id}`, `user:email:{email}`).
    pub user_ttl_secs: u64,
    /// TTL of cached per-user assistant lists.
    pub ai_list_ttl_secs: u64,
    /// TTL of cached per-user retrieval-index lists.
    pub rag_list_ttl_secs: u64,
    /// TTL of cached per-user conversation lists.
    pub conversation_list_ttl_secs: u64,
    /// Maximum number of conversations returned by a listing.
    pub conversation_list_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            user_ttl_secs: 3600,
            ai_list_ttl_secs: 1800,
            rag_list_ttl_secs: 1800,
            conversation_list_ttl_secs: 900,
            conversation_list_limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cache_contract() {
        let config = ServiceConfig::default();
        assert_eq!(config.user_ttl_secs, 3600);
        assert_eq!(config.ai_list_ttl_secs, 1800);
        assert_eq!(config.rag_list_ttl_secs, 1800);
        assert_eq!(config.conversation_list_ttl_secs, 900);
        assert_eq!(config.conversation_list_limit, 50);
    }
}
