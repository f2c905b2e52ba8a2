//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.
//! Primary-record families hold CBOR rows; index families hold empty
//! values under composite keys built by [`crate::keys`].

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary user records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Unique index: lowercased email to `user_id`.
    pub const USERS_BY_EMAIL: &str = "users_by_email";

    /// Primary session records, keyed by `token_hash`.
    pub const SESSIONS: &str = "sessions";

    /// Primary custom-assistant records, keyed by `ai_id`.
    pub const AIS: &str = "ais";

    /// Index: assistants by owner, keyed by `user_id || ai_id`.
    pub const AIS_BY_USER: &str = "ais_by_user";

    /// Primary retrieval-index instance records, keyed by `instance_id`.
    pub const RAG_INSTANCES: &str = "rag_instances";

    /// Index: instances by owner, keyed by `user_id || instance_id`.
    pub const RAG_INSTANCES_BY_USER: &str = "rag_instances_by_user";

    /// Index: instances by assistant type, keyed by `ai_type || 0x00 || instance_id`.
    pub const RAG_INSTANCES_BY_TYPE: &str = "rag_instances_by_type";

    /// Primary knowledge-file records, keyed by `file_id`.
    pub const KNOWLEDGE_FILES: &str = "knowledge_files";

    /// Index: files by instance, keyed by `instance_id || file_id`.
    pub const KNOWLEDGE_FILES_BY_INSTANCE: &str = "knowledge_files_by_instance";

    /// Index: files by uploader, keyed by `user_id || file_id`.
    pub const KNOWLEDGE_FILES_BY_USER: &str = "knowledge_files_by_user";

    /// Primary conversation records, keyed by `conversation_id`.
    pub const CONVERSATIONS: &str = "conversations";

    /// Index: conversations by owner, keyed by `user_id || conversation_id`.
    pub const CONVERSATIONS_BY_USER: &str = "conversations_by_user";

    /// Primary message records, keyed by `message_id`.
    pub const MESSAGES: &str = "messages";

    /// Index ordering messages within a conversation, keyed by
    /// `conversation_id || be64(created_at_millis) || message_id`.
    pub const MESSAGES_BY_CONVERSATION: &str = "messages_by_conversation";

    /// Daily stats snapshots, keyed by `be32(days_from_ce)`.
    pub const SYSTEM_STATS: &str = "system_stats";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_EMAIL,
        cf::SESSIONS,
        cf::AIS,
        cf::AIS_BY_USER,
        cf::RAG_INSTANCES,
        cf::RAG_INSTANCES_BY_USER,
        cf::RAG_INSTANCES_BY_TYPE,
        cf::KNOWLEDGE_FILES,
        cf::KNOWLEDGE_FILES_BY_INSTANCE,
        cf::KNOWLEDGE_FILES_BY_USER,
        cf::CONVERSATIONS,
        cf::CONVERSATIONS_BY_USER,
        cf::MESSAGES,
        cf::MESSAGES_BY_CONVERSATION,
        cf::SYSTEM_STATS,
    ]
}
