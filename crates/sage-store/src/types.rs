//! Domain types stored in the database.
//!
//! These types represent the persisted state of users, sessions, custom
//! assistants, retrieval-index instances, knowledge files, conversations,
//! messages, and daily stats snapshots. Soft-deletable rows carry an
//! `is_active` flag; the store itself never filters on it.

use chrono::{DateTime, NaiveDate, Utc};
use sage_core::{AiId, ConversationId, KnowledgeFileId, MessageId, RagInstanceId, UserId};
use serde::{Deserialize, Serialize};

/// A user account record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// Email address. Unique and immutable after creation.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Short non-reversible hash of the email, for display/lookup.
    pub email_hash: String,
    /// Subscription tier.
    pub subscription: SubscriptionType,
    /// Soft-delete flag; inactive users are hidden from default paths.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Subscription tier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    /// Free tier.
    #[default]
    Free,
    /// Paid tier.
    Pro,
}

/// A bearer-session record, keyed by the hash of the raw token.
///
/// The raw token is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Hash of the bearer token. Primary key.
    pub token_hash: String,
    /// Owning user.
    pub user_id: UserId,
    /// Hard expiry; the session never authorizes past this instant.
    pub expires_at: DateTime<Utc>,
    /// Client user agent, if reported.
    pub user_agent: Option<String>,
    /// Client IP address, if reported.
    pub ip_address: Option<String>,
    /// Whether the session may still authorize access.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the session authorized a request.
    pub last_used_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session has passed its hard expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A user-owned custom assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAi {
    /// Unique identifier for the assistant.
    pub ai_id: AiId,
    /// Owning user.
    pub user_id: UserId,
    /// Human-readable name.
    pub name: String,
    /// Description shown to the owner.
    pub description: String,
    /// Denormalized list of contributed knowledge filenames.
    pub knowledge_files: Vec<String>,
    /// Denormalized list of blob URLs backing the assistant.
    pub blob_urls: Vec<String>,
    /// Number of knowledge chunks recorded at creation.
    pub chunks_count: u32,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a retrieval-index instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagStatus {
    /// Index is built and servable.
    Active,
    /// Index has been deleted and must not be served.
    Deleted,
    /// Index build or maintenance failed.
    Error,
}

/// A retrieval-index artifact set backing an assistant.
///
/// Built-in assistant types share one instance with `user_id` and `ai_id`
/// unset; custom assistants get a per-owner instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagInstance {
    /// Unique identifier for the instance.
    pub instance_id: RagInstanceId,
    /// Assistant type this index serves (e.g. a built-in type or `custom`).
    pub ai_type: String,
    /// Owning user; `None` for shared built-in instances.
    pub user_id: Option<UserId>,
    /// Linked custom assistant; `None` for shared built-in instances.
    pub ai_id: Option<AiId>,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Blob URL of the serialized knowledge graph.
    pub graph_blob_url: String,
    /// Blob URL of the serialized vector index.
    pub vector_blob_url: String,
    /// Blob URL of the index configuration.
    pub config_blob_url: String,
    /// Total chunks across the index.
    pub total_chunks: u32,
    /// Total tokens across the index.
    pub total_tokens: u64,
    /// Number of source files contributing to the index.
    pub file_count: u32,
    /// Lifecycle status.
    pub status: RagStatus,
    /// Log line reported by the ingestion collaborator, if any.
    pub processing_log: Option<String>,
    /// Touched on every successful scoped read.
    pub last_accessed_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Processing outcome of an uploaded knowledge file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Uploaded, awaiting the ingestion collaborator.
    Pending,
    /// Ingestion succeeded.
    Processed,
    /// Ingestion failed.
    Error,
}

/// Metadata for one uploaded knowledge source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// Unique identifier for the file record.
    pub file_id: KnowledgeFileId,
    /// Uploading user.
    pub user_id: UserId,
    /// Retrieval-index instance the file contributes to.
    pub rag_instance_id: RagInstanceId,
    /// Stored filename (path-scheme name in the object store).
    pub filename: String,
    /// Original filename as uploaded.
    pub original_name: String,
    /// MIME type or extension of the file.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Durable object-store URL of the source file.
    pub blob_url: String,
    /// Ingestion outcome; transitions from `Pending` exactly once.
    pub processing_status: ProcessingStatus,
    /// Token count reported by the ingestion collaborator.
    pub token_count: u64,
    /// Extracted text reported by the collaborator, if retained.
    pub extracted_text: Option<String>,
    /// When ingestion completed successfully.
    pub processed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A conversation between a user and an assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier for the conversation.
    pub conversation_id: ConversationId,
    /// Owning user.
    pub user_id: UserId,
    /// Assistant type the conversation is with.
    pub ai_type: String,
    /// Linked custom assistant, if any.
    pub ai_id: Option<AiId>,
    /// Title shown in listings.
    pub title: String,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Bumped whenever a message is appended.
    pub updated_at: DateTime<Utc>,
}

/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Sent by the human user.
    User,
    /// Produced by the assistant.
    Assistant,
}

/// One message within a conversation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message.
    pub message_id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author role.
    pub role: MessageRole,
    /// Message body.
    pub content: String,
    /// Opaque key/value metadata.
    pub metadata: serde_json::Value,
    /// Creation timestamp; orders the message within its conversation.
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts snapshotted once per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    /// Snapshot date. Primary key; upserted, never duplicated.
    pub date: NaiveDate,
    /// Active user count at snapshot time.
    pub total_users: u64,
    /// Active custom-assistant count at snapshot time.
    pub total_ais: u64,
    /// All-time message count at snapshot time.
    pub total_messages: u64,
}
