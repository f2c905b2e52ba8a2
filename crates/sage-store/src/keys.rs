//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions to encode and decode keys for primary
//! records and secondary indexes. All composite keys are designed to
//! support efficient prefix scans; entity id components are the 16 raw
//! bytes of the underlying UUID.

use chrono::NaiveDate;
use sage_core::{AiId, ConversationId, KnowledgeFileId, MessageId, RagInstanceId, UserId};

/// Encode a user key (just the user ID bytes).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Encode the unique email index key (lowercased email bytes).
#[must_use]
pub fn email_key(email: &str) -> Vec<u8> {
    email.to_lowercase().into_bytes()
}

/// Encode a session key (the token hash bytes).
#[must_use]
pub fn session_key(token_hash: &str) -> Vec<u8> {
    token_hash.as_bytes().to_vec()
}

/// Encode an assistant key (just the assistant ID bytes).
#[must_use]
pub fn ai_key(ai_id: &AiId) -> Vec<u8> {
    ai_id.as_bytes().to_vec()
}

/// Encode a user-assistant index key: `user_id || ai_id`.
#[must_use]
pub fn user_ai_key(user_id: &UserId, ai_id: &AiId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(ai_id.as_bytes());
    key
}

/// Encode a user prefix for scanning any per-user index.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the assistant ID from a user-assistant key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_ai_id(key: &[u8]) -> AiId {
    AiId::from_uuid(uuid_tail(key, 16))
}

/// Encode a retrieval-index instance key (just the instance ID bytes).
#[must_use]
pub fn rag_instance_key(instance_id: &RagInstanceId) -> Vec<u8> {
    instance_id.as_bytes().to_vec()
}

/// Encode a user-instance index key: `user_id || instance_id`.
#[must_use]
pub fn user_rag_instance_key(user_id: &UserId, instance_id: &RagInstanceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(instance_id.as_bytes());
    key
}

/// Encode a type-instance index key: `ai_type || 0x00 || instance_id`.
///
/// The NUL separator keeps one type name from prefix-matching another
/// (e.g. `study` and `study-helper`).
#[must_use]
pub fn type_rag_instance_key(ai_type: &str, instance_id: &RagInstanceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ai_type.len() + 17);
    key.extend_from_slice(ai_type.as_bytes());
    key.push(0);
    key.extend_from_slice(instance_id.as_bytes());
    key
}

/// Encode a type prefix for scanning instances by assistant type.
#[must_use]
pub fn type_prefix(ai_type: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(ai_type.len() + 1);
    key.extend_from_slice(ai_type.as_bytes());
    key.push(0);
    key
}

/// Extract the instance ID from any index key ending in the instance bytes.
///
/// # Panics
///
/// Panics if the key is shorter than 16 bytes.
#[must_use]
pub fn extract_rag_instance_id(key: &[u8]) -> RagInstanceId {
    RagInstanceId::from_uuid(uuid_tail(key, key.len() - 16))
}

/// Encode a knowledge-file key (just the file ID bytes).
#[must_use]
pub fn knowledge_file_key(file_id: &KnowledgeFileId) -> Vec<u8> {
    file_id.as_bytes().to_vec()
}

/// Encode an instance-file index key: `instance_id || file_id`.
#[must_use]
pub fn instance_file_key(instance_id: &RagInstanceId, file_id: &KnowledgeFileId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(instance_id.as_bytes());
    key.extend_from_slice(file_id.as_bytes());
    key
}

/// Encode an instance prefix for scanning files by instance.
#[must_use]
pub fn rag_instance_prefix(instance_id: &RagInstanceId) -> Vec<u8> {
    instance_id.as_bytes().to_vec()
}

/// Encode a user-file index key: `user_id || file_id`.
#[must_use]
pub fn user_file_key(user_id: &UserId, file_id: &KnowledgeFileId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(file_id.as_bytes());
    key
}

/// Extract the file ID from an instance-file or user-file key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_knowledge_file_id(key: &[u8]) -> KnowledgeFileId {
    KnowledgeFileId::from_uuid(uuid_tail(key, 16))
}

/// Encode a conversation key (just the conversation ID bytes).
#[must_use]
pub fn conversation_key(conversation_id: &ConversationId) -> Vec<u8> {
    conversation_id.as_bytes().to_vec()
}

/// Encode a user-conversation index key: `user_id || conversation_id`.
#[must_use]
pub fn user_conversation_key(user_id: &UserId, conversation_id: &ConversationId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(conversation_id.as_bytes());
    key
}

/// Extract the conversation ID from a user-conversation key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_conversation_id(key: &[u8]) -> ConversationId {
    ConversationId::from_uuid(uuid_tail(key, 16))
}

/// Encode a message key (just the message ID bytes).
#[must_use]
pub fn message_key(message_id: &MessageId) -> Vec<u8> {
    message_id.as_bytes().to_vec()
}

/// Encode a conversation-message index key:
/// `conversation_id || be64(created_at_millis) || message_id`.
///
/// The big-endian timestamp makes a forward prefix scan yield messages in
/// creation order; the message id breaks ties between same-millisecond
/// appends.
#[must_use]
pub fn conversation_message_key(
    conversation_id: &ConversationId,
    created_at_millis: i64,
    message_id: &MessageId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(conversation_id.as_bytes());
    key.extend_from_slice(&created_at_millis.to_be_bytes());
    key.extend_from_slice(message_id.as_bytes());
    key
}

/// Encode a conversation prefix for scanning messages in order.
#[must_use]
pub fn conversation_prefix(conversation_id: &ConversationId) -> Vec<u8> {
    conversation_id.as_bytes().to_vec()
}

/// Extract the message ID from a conversation-message key.
///
/// # Panics
///
/// Panics if the key is not at least 40 bytes.
#[must_use]
pub fn extract_message_id(key: &[u8]) -> MessageId {
    MessageId::from_uuid(uuid_tail(key, 24))
}

/// Encode a stats key from the snapshot date.
///
/// Big-endian day count keeps the family ordered by date, so the latest
/// snapshot is the last key. Day counts are non-negative for all CE dates.
#[must_use]
pub fn stats_key(date: NaiveDate) -> Vec<u8> {
    use chrono::Datelike;
    date.num_days_from_ce().to_be_bytes().to_vec()
}

fn uuid_tail(key: &[u8], offset: usize) -> uuid::Uuid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[offset..offset + 16]);
    uuid::Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ai_key_roundtrip() {
        let user_id = UserId::generate();
        let ai_id = AiId::generate();

        let key = user_ai_key(&user_id, &ai_id);
        assert_eq!(key.len(), 32);
        assert!(key.starts_with(&user_prefix(&user_id)));

        assert_eq!(extract_ai_id(&key), ai_id);
    }

    #[test]
    fn conversation_message_key_orders_by_time() {
        let conversation_id = ConversationId::generate();
        let early = conversation_message_key(&conversation_id, 1_000, &MessageId::generate());
        let late = conversation_message_key(&conversation_id, 2_000, &MessageId::generate());

        assert!(early < late);
        assert_eq!(extract_message_id(&late).as_bytes().len(), 16);
    }

    #[test]
    fn type_prefix_does_not_match_longer_type() {
        let id = RagInstanceId::generate();
        let key = type_rag_instance_key("study-helper", &id);
        assert!(!key.starts_with(&type_prefix("study")));
        assert!(key.starts_with(&type_prefix("study-helper")));
        assert_eq!(extract_rag_instance_id(&key), id);
    }

    #[test]
    fn email_key_is_lowercased() {
        assert_eq!(email_key("A@X.Com"), email_key("a@x.com"));
    }

    #[test]
    fn stats_keys_order_by_date() {
        let jan = stats_key(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let feb = stats_key(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(jan < feb);
    }
}
