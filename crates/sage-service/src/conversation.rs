//! Conversation and message service.
//!
//! Listings are cache-aside under `user:{id}:conversations`, newest
//! activity first, capped, with a single-message preview per entry.
//! Appending a message bumps the conversation's `updated_at` and
//! invalidates the owner's listing through the conversation's own
//! `user_id`, so the caller cannot invalidate the wrong user.

use std::sync::Arc;

use chrono::Utc;
use sage_cache::{keys, CacheService, KvCache};
use sage_core::{AiId, ConversationId, MessageId, UserId};
use sage_store::{Conversation, Message, MessageRole, Store};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::types::{ConversationDetail, ConversationSummary, MessagePreview};

/// Conversation lifecycle and message append.
pub struct ConversationService<S, C> {
    store: Arc<S>,
    cache: CacheService<C>,
    config: ServiceConfig,
}

impl<S: Store, C: KvCache> ConversationService<S, C> {
    /// Create a conversation service.
    #[must_use]
    pub fn new(store: Arc<S>, kv: Arc<C>, config: ServiceConfig) -> Self {
        Self {
            store,
            cache: CacheService::new(kv),
            config,
        }
    }

    /// Start a conversation. An omitted title defaults to
    /// `"{ai_type} conversation"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn create_conversation(
        &self,
        user_id: UserId,
        ai_type: &str,
        ai_id: Option<AiId>,
        title: Option<String>,
    ) -> Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            conversation_id: ConversationId::generate(),
            user_id,
            ai_type: ai_type.to_string(),
            ai_id,
            title: title.unwrap_or_else(|| format!("{ai_type} conversation")),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put_conversation(&conversation)?;

        self.cache.del(&keys::user_conversations(&user_id)).await;

        tracing::info!(
            conversation_id = %conversation.conversation_id,
            user_id = %user_id,
            ai_type,
            "Created conversation"
        );

        Ok(conversation)
    }

    /// List a user's active conversations with previews, most recently
    /// updated first, capped at the configured limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>> {
        let key = keys::user_conversations(user_id);
        if let Some(cached) = self.cache.get::<Vec<ConversationSummary>>(&key).await {
            return Ok(cached);
        }

        let mut conversations: Vec<Conversation> = self
            .store
            .list_conversations_by_user(user_id)?
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        conversations.truncate(self.config.conversation_list_limit);

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let last_message = self
                .store
                .last_message(&conversation.conversation_id)?
                .as_ref()
                .map(MessagePreview::from);
            let message_count = self.store.count_messages(&conversation.conversation_id)?;
            let assistant_name = self.assistant_name(conversation.ai_id)?;

            summaries.push(ConversationSummary {
                conversation_id: conversation.conversation_id,
                ai_type: conversation.ai_type,
                ai_id: conversation.ai_id,
                title: conversation.title,
                assistant_name,
                last_message,
                message_count,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
            });
        }

        self.cache
            .set(&key, &summaries, self.config.conversation_list_ttl_secs)
            .await;

        Ok(summaries)
    }

    /// Fetch one of the user's conversations with all messages in
    /// creation order.
    ///
    /// Returns `None` when the conversation is absent, soft-deleted, or
    /// owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_conversation(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationDetail>> {
        let Some(conversation) = self.store.get_conversation(conversation_id)? else {
            return Ok(None);
        };
        if conversation.user_id != *user_id || !conversation.is_active {
            return Ok(None);
        }

        let messages = self.store.list_messages(conversation_id)?;
        let assistant = match conversation.ai_id {
            Some(ai_id) => self.store.get_ai(&ai_id)?,
            None => None,
        };

        Ok(Some(ConversationDetail {
            assistant_name: assistant.as_ref().map(|ai| ai.name.clone()),
            assistant_description: assistant.map(|ai| ai.description),
            conversation,
            messages,
        }))
    }

    /// Append a message and bump the conversation's activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the conversation does not
    /// exist, or a storage error.
    pub async fn add_message(
        &self,
        conversation_id: &ConversationId,
        role: MessageRole,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message> {
        let mut conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or(ServiceError::NotFound)?;

        let message = Message {
            message_id: MessageId::generate(),
            conversation_id: *conversation_id,
            role,
            content: content.to_string(),
            metadata: metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: Utc::now(),
        };
        self.store.put_message(&message)?;

        conversation.updated_at = message.created_at;
        self.store.put_conversation(&conversation)?;

        self.cache
            .del(&keys::user_conversations(&conversation.user_id))
            .await;

        Ok(message)
    }

    /// Rename one of the user's conversations.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the conversation is absent or
    /// owned by someone else, or a storage error.
    pub async fn update_conversation_title(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<Conversation> {
        let mut conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or(ServiceError::NotFound)?;
        if conversation.user_id != *user_id {
            return Err(ServiceError::NotFound);
        }

        conversation.title = title.to_string();
        self.store.put_conversation(&conversation)?;

        self.cache.del(&keys::user_conversations(user_id)).await;

        Ok(conversation)
    }

    /// Soft-delete one of the user's conversations. Messages stay in
    /// place for the administrative bypass.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the conversation is absent or
    /// owned by someone else, or a storage error.
    pub async fn delete_conversation(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<()> {
        let mut conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or(ServiceError::NotFound)?;
        if conversation.user_id != *user_id {
            return Err(ServiceError::NotFound);
        }

        conversation.is_active = false;
        conversation.updated_at = Utc::now();
        self.store.put_conversation(&conversation)?;

        self.cache.del(&keys::user_conversations(user_id)).await;

        tracing::info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            "Deleted conversation"
        );
        Ok(())
    }

    fn assistant_name(&self, ai_id: Option<AiId>) -> Result<Option<String>> {
        match ai_id {
            Some(ai_id) => Ok(self.store.get_ai(&ai_id)?.map(|ai| ai.name)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_cache::MemoryKv;
    use sage_store::RocksStore;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<RocksStore>, ConversationService<RocksStore, MemoryKv>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let service = ConversationService::new(
            Arc::clone(&store),
            Arc::new(MemoryKv::new()),
            ServiceConfig::default(),
        );
        (dir, store, service)
    }

    #[tokio::test]
    async fn default_title_names_the_assistant_type() {
        let (_dir, _store, service) = fixture();

        let conversation = service
            .create_conversation(UserId::generate(), "companion", None, None)
            .await
            .unwrap();
        assert_eq!(conversation.title, "companion conversation");

        let titled = service
            .create_conversation(UserId::generate(), "companion", None, Some("Trip".to_string()))
            .await
            .unwrap();
        assert_eq!(titled.title, "Trip");
    }

    #[tokio::test]
    async fn messages_append_in_order() {
        let (_dir, _store, service) = fixture();
        let user_id = UserId::generate();

        let conversation = service
            .create_conversation(user_id, "companion", None, None)
            .await
            .unwrap();

        service
            .add_message(&conversation.conversation_id, MessageRole::User, "hi", None)
            .await
            .unwrap();
        service
            .add_message(&conversation.conversation_id, MessageRole::Assistant, "hello", None)
            .await
            .unwrap();

        let detail = service
            .get_conversation(&user_id, &conversation.conversation_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].content, "hi");
        assert_eq!(detail.messages[1].content, "hello");
    }

    #[tokio::test]
    async fn listing_previews_latest_message_and_orders_by_activity() {
        let (_dir, _store, service) = fixture();
        let user_id = UserId::generate();

        let older = service
            .create_conversation(user_id, "companion", None, None)
            .await
            .unwrap();
        let newer = service
            .create_conversation(user_id, "companion", None, None)
            .await
            .unwrap();

        service
            .add_message(&newer.conversation_id, MessageRole::User, "first", None)
            .await
            .unwrap();
        service
            .add_message(&newer.conversation_id, MessageRole::Assistant, "second", None)
            .await
            .unwrap();
        // Activity moves the older conversation to the front
        service
            .add_message(&older.conversation_id, MessageRole::User, "ping", None)
            .await
            .unwrap();

        let listed = service.get_user_conversations(&user_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].conversation_id, older.conversation_id);
        assert_eq!(listed[1].message_count, 2);
        assert_eq!(
            listed[1].last_message.as_ref().unwrap().content,
            "second"
        );
    }

    #[tokio::test]
    async fn listing_is_capped() {
        let (_dir, store, _unused) = fixture();
        let service = ConversationService::new(
            Arc::clone(&store),
            Arc::new(MemoryKv::new()),
            ServiceConfig {
                conversation_list_limit: 2,
                ..ServiceConfig::default()
            },
        );
        let user_id = UserId::generate();

        for _ in 0..3 {
            service
                .create_conversation(user_id, "companion", None, None)
                .await
                .unwrap();
        }

        assert_eq!(service.get_user_conversations(&user_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn soft_deleted_conversations_vanish_from_default_paths() {
        let (_dir, store, service) = fixture();
        let user_id = UserId::generate();

        let conversation = service
            .create_conversation(user_id, "companion", None, None)
            .await
            .unwrap();
        service
            .add_message(&conversation.conversation_id, MessageRole::User, "hi", None)
            .await
            .unwrap();
        service
            .delete_conversation(&user_id, &conversation.conversation_id)
            .await
            .unwrap();

        assert!(service
            .get_conversation(&user_id, &conversation.conversation_id)
            .await
            .unwrap()
            .is_none());
        assert!(service.get_user_conversations(&user_id).await.unwrap().is_empty());

        // Messages survive for raw access
        assert_eq!(store.count_messages(&conversation.conversation_id).unwrap(), 1);
    }

    #[tokio::test]
    async fn ownership_is_enforced() {
        let (_dir, _store, service) = fixture();
        let owner = UserId::generate();
        let intruder = UserId::generate();

        let conversation = service
            .create_conversation(owner, "companion", None, None)
            .await
            .unwrap();

        assert!(service
            .get_conversation(&intruder, &conversation.conversation_id)
            .await
            .unwrap()
            .is_none());
        let err = service
            .update_conversation_title(&intruder, &conversation.conversation_id, "mine")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn rename_shows_up_in_the_next_listing() {
        let (_dir, _store, service) = fixture();
        let user_id = UserId::generate();

        let conversation = service
            .create_conversation(user_id, "companion", None, None)
            .await
            .unwrap();
        // Populate the cache, then rename
        service.get_user_conversations(&user_id).await.unwrap();
        service
            .update_conversation_title(&user_id, &conversation.conversation_id, "Renamed")
            .await
            .unwrap();

        let listed = service.get_user_conversations(&user_id).await.unwrap();
        assert_eq!(listed[0].title, "Renamed");
    }
}
