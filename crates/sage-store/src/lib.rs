//! `RocksDB` system of record for the sage platform.
//!
//! This crate persists users, sessions, custom assistants, retrieval-index
//! instances, knowledge files, conversations, messages, and daily stats
//! snapshots using `RocksDB` with column families for efficient indexing.
//!
//! The store is deliberately dumb: it never filters on soft-delete flags
//! or expiry. Default-path filtering belongs to the service layer; raw
//! trait access doubles as the administrative bypass used to verify
//! tombstones.
//!
//! # Architecture
//!
//! Primary records are CBOR rows keyed by entity id; secondary indexes
//! are empty values under composite keys (see [`keys`] and [`schema`]).
//!
//! # Example
//!
//! ```no_run
//! use sage_store::{RocksStore, Store};
//! use sage_core::UserId;
//!
//! let store = RocksStore::open("/tmp/sage-db").unwrap();
//!
//! let user_id = UserId::generate();
//! let ais = store.list_ais_by_user(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Conversation, CustomAi, KnowledgeFile, Message, MessageRole, ProcessingStatus, RagInstance,
    RagStatus, SessionRecord, SubscriptionType, SystemStats, User,
};

use chrono::{DateTime, Utc};
use sage_core::{AiId, ConversationId, KnowledgeFileId, RagInstanceId, UserId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the system of record, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing). List methods
/// return every row including soft-deleted ones; callers apply their own
/// visibility filters.
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user, enforcing email uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a user with the same email
    /// already exists, or an error if the database operation fails.
    fn insert_user(&self, user: &User) -> Result<()>;

    /// Insert or update a user record.
    ///
    /// Does not re-check email uniqueness; use for updates to existing rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Get a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count users with `is_active` set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_active_users(&self) -> Result<u64>;

    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Insert or update a session record, keyed by its token hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_session(&self, session: &SessionRecord) -> Result<()>;

    /// Get a session by token hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_session(&self, token_hash: &str) -> Result<Option<SessionRecord>>;

    /// Flip `is_active` off for every active session past its expiry.
    ///
    /// Returns the number of sessions deactivated. Intended for periodic
    /// maintenance, not per-request use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn deactivate_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    // =========================================================================
    // Custom Assistant Operations
    // =========================================================================

    /// Insert or update an assistant record.
    ///
    /// This also maintains the owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_ai(&self, ai: &CustomAi) -> Result<()>;

    /// Get an assistant by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_ai(&self, ai_id: &AiId) -> Result<Option<CustomAi>>;

    /// List all assistants belonging to a user, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_ais_by_user(&self, user_id: &UserId) -> Result<Vec<CustomAi>>;

    /// Count assistants with `is_active` set, across all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_active_ais(&self) -> Result<u64>;

    // =========================================================================
    // Retrieval-Index Instance Operations
    // =========================================================================

    /// Insert or update a retrieval-index instance record.
    ///
    /// This also maintains the owner and type indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_rag_instance(&self, instance: &RagInstance) -> Result<()>;

    /// Get an instance by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_rag_instance(&self, instance_id: &RagInstanceId) -> Result<Option<RagInstance>>;

    /// List all instances owned by a user, regardless of status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rag_instances_by_user(&self, user_id: &UserId) -> Result<Vec<RagInstance>>;

    /// List all instances serving an assistant type, regardless of status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rag_instances_by_type(&self, ai_type: &str) -> Result<Vec<RagInstance>>;

    // =========================================================================
    // Knowledge File Operations
    // =========================================================================

    /// Insert or update a knowledge-file record.
    ///
    /// This also maintains the instance and uploader indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_knowledge_file(&self, file: &KnowledgeFile) -> Result<()>;

    /// Get a knowledge file by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_knowledge_file(&self, file_id: &KnowledgeFileId) -> Result<Option<KnowledgeFile>>;

    /// List all files contributing to an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_knowledge_files_by_instance(
        &self,
        instance_id: &RagInstanceId,
    ) -> Result<Vec<KnowledgeFile>>;

    /// List all files uploaded by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_knowledge_files_by_user(&self, user_id: &UserId) -> Result<Vec<KnowledgeFile>>;

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    /// Insert or update a conversation record.
    ///
    /// This also maintains the owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Get a conversation by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>>;

    /// List all conversations belonging to a user, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_conversations_by_user(&self, user_id: &UserId) -> Result<Vec<Conversation>>;

    // =========================================================================
    // Message Operations
    // =========================================================================

    /// Append a message record.
    ///
    /// This also maintains the per-conversation ordering index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_message(&self, message: &Message) -> Result<()>;

    /// List a conversation's messages in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;

    /// Get the most recent message of a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn last_message(&self, conversation_id: &ConversationId) -> Result<Option<Message>>;

    /// Count messages in a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64>;

    /// Count all messages ever stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_all_messages(&self) -> Result<u64>;

    // =========================================================================
    // Stats Operations
    // =========================================================================

    /// Upsert the stats snapshot for its date.
    ///
    /// Repeated writes for the same date overwrite the existing row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_system_stats(&self, stats: &SystemStats) -> Result<()>;

    /// Get the most recent dated stats snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn latest_system_stats(&self) -> Result<Option<SystemStats>>;
}
