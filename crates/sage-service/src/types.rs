//! Projections and request types exposed by the services.
//!
//! Read operations return enriched projections rather than bare rows:
//! listings stitch in related summaries the way callers consume them, and
//! the same shapes are what goes into the cache.

use chrono::{DateTime, Utc};
use sage_core::{AiId, ConversationId, RagInstanceId, UserId};
use sage_store::{
    Conversation, CustomAi, KnowledgeFile, Message, MessageRole, RagInstance, RagStatus,
    SubscriptionType, User,
};
use serde::{Deserialize, Serialize};

/// The externally visible projection of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Short non-reversible email hash.
    pub email_hash: String,
    /// Subscription tier.
    pub subscription: SubscriptionType,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            email_hash: user.email_hash.clone(),
            subscription: user.subscription,
            created_at: user.created_at,
        }
    }
}

/// A user profile enriched with assistant summaries and counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Short non-reversible email hash.
    pub email_hash: String,
    /// Subscription tier.
    pub subscription: SubscriptionType,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Active custom assistants owned by the user.
    pub ais: Vec<AssistantBrief>,
    /// Number of active conversations.
    pub conversation_count: u64,
}

/// A short assistant summary nested in a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantBrief {
    /// Unique identifier for the assistant.
    pub ai_id: AiId,
    /// Human-readable name.
    pub name: String,
    /// Description shown to the owner.
    pub description: String,
    /// Number of knowledge chunks recorded at creation.
    pub chunks_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&CustomAi> for AssistantBrief {
    fn from(ai: &CustomAi) -> Self {
        Self {
            ai_id: ai.ai_id,
            name: ai.name.clone(),
            description: ai.description.clone(),
            chunks_count: ai.chunks_count,
            created_at: ai.created_at,
        }
    }
}

/// The retrieval-index summary nested in assistant projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagSummary {
    /// Unique identifier for the instance.
    pub instance_id: RagInstanceId,
    /// Lifecycle status.
    pub status: RagStatus,
    /// Total chunks across the index.
    pub total_chunks: u32,
    /// Total tokens across the index.
    pub total_tokens: u64,
    /// Number of source files contributing to the index.
    pub file_count: u32,
    /// Touched on every successful scoped read.
    pub last_accessed_at: DateTime<Utc>,
}

impl From<&RagInstance> for RagSummary {
    fn from(instance: &RagInstance) -> Self {
        Self {
            instance_id: instance.instance_id,
            status: instance.status,
            total_chunks: instance.total_chunks,
            total_tokens: instance.total_tokens,
            file_count: instance.file_count,
            last_accessed_at: instance.last_accessed_at,
        }
    }
}

/// One entry of a user's assistant listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSummary {
    /// Unique identifier for the assistant.
    pub ai_id: AiId,
    /// Human-readable name.
    pub name: String,
    /// Description shown to the owner.
    pub description: String,
    /// Number of knowledge chunks recorded at creation.
    pub chunks_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Linked retrieval-index instance, if one is active.
    pub rag_instance: Option<RagSummary>,
    /// Number of conversations held with this assistant.
    pub conversation_count: u64,
}

/// Full assistant detail for the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantDetail {
    /// The assistant record.
    pub ai: CustomAi,
    /// Linked retrieval-index instance, if one is active.
    pub rag_instance: Option<RagSummary>,
    /// Successfully ingested knowledge files.
    pub processed_files: Vec<KnowledgeFileSummary>,
    /// Number of conversations held with this assistant.
    pub conversation_count: u64,
}

/// Summary of one ingested knowledge file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFileSummary {
    /// Stored filename.
    pub filename: String,
    /// Original filename as uploaded.
    pub original_name: String,
    /// MIME type or extension.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// When ingestion completed.
    pub processed_at: Option<DateTime<Utc>>,
    /// Token count reported by the ingestion collaborator.
    pub token_count: u64,
}

impl From<&KnowledgeFile> for KnowledgeFileSummary {
    fn from(file: &KnowledgeFile) -> Self {
        Self {
            filename: file.filename.clone(),
            original_name: file.original_name.clone(),
            file_type: file.file_type.clone(),
            file_size: file.file_size,
            processed_at: file.processed_at,
            token_count: file.token_count,
        }
    }
}

/// A retrieval-index instance with its ingested source files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagInstanceDetail {
    /// The instance record.
    pub instance: RagInstance,
    /// Successfully ingested knowledge files.
    pub processed_files: Vec<KnowledgeFileSummary>,
}

/// A knowledge file with its owning instance's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserKnowledgeFile {
    /// The file record.
    pub file: KnowledgeFile,
    /// Name of the owning retrieval-index instance, if it still exists.
    pub rag_name: Option<String>,
    /// Assistant type of the owning instance, if it still exists.
    pub rag_ai_type: Option<String>,
}

/// The last message of a conversation, shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePreview {
    /// Author role.
    pub role: MessageRole,
    /// Message body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessagePreview {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

/// One entry of a user's conversation listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Unique identifier for the conversation.
    pub conversation_id: ConversationId,
    /// Assistant type the conversation is with.
    pub ai_type: String,
    /// Linked custom assistant, if any.
    pub ai_id: Option<AiId>,
    /// Title shown in listings.
    pub title: String,
    /// Name of the linked custom assistant, if any.
    pub assistant_name: Option<String>,
    /// The most recent message, if any.
    pub last_message: Option<MessagePreview>,
    /// Total message count.
    pub message_count: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Bumped whenever a message is appended.
    pub updated_at: DateTime<Utc>,
}

/// A full conversation with all its messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    /// The conversation record.
    pub conversation: Conversation,
    /// Name of the linked custom assistant, if any.
    pub assistant_name: Option<String>,
    /// Description of the linked custom assistant, if any.
    pub assistant_description: Option<String>,
    /// All messages in creation order.
    pub messages: Vec<Message>,
}

/// The session projection kept in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    /// Owning user.
    pub user_id: UserId,
    /// Hard expiry carried alongside so stale entries self-identify.
    pub expires_at: DateTime<Utc>,
}

/// Request to create a retrieval-index instance.
#[derive(Debug, Clone)]
pub struct CreateRagInstance {
    /// Assistant type this index serves.
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
}

/// Request to register an uploaded knowledge source file.
#[derive(Debug, Clone)]
pub struct CreateKnowledgeFile {
    /// Uploading user.
    pub user_id: UserId,
    /// Instance the file contributes to.
    pub rag_instance_id: RagInstanceId,
    /// Stored filename.
    pub filename: String,
    /// Original filename as uploaded.
    pub original_name: String,
    /// MIME type or extension.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Durable object-store URL of the source file.
    pub blob_url: String,
}

/// Terminal ingestion outcome for a knowledge file.
///
/// A file leaves the pending state exactly once; the type makes a
/// transition back to pending unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Ingestion succeeded.
    Processed,
    /// Ingestion failed.
    Error,
}

impl FileOutcome {
    /// The stored status this outcome maps to.
    #[must_use]
    pub const fn as_status(self) -> sage_store::ProcessingStatus {
        match self {
            Self::Processed => sage_store::ProcessingStatus::Processed,
            Self::Error => sage_store::ProcessingStatus::Error,
        }
    }
}
