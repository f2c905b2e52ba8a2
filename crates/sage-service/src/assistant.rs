//! Custom-assistant service.
//!
//! Listings are cache-aside under `user:{id}:ais` and enriched with the
//! linked retrieval-index summary and conversation count. Deletion is a
//! soft delete; reclaiming index storage is a separate
//! [`RagService`](crate::rag::RagService) concern.

use std::sync::Arc;

use chrono::Utc;
use sage_cache::{keys, CacheService, KvCache};
use sage_core::{AiId, UserId};
use sage_store::{CustomAi, ProcessingStatus, RagStatus, Store};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::types::{AiSummary, AssistantDetail, KnowledgeFileSummary, RagSummary};

/// Assistant creation, listing, and soft deletion.
pub struct AssistantService<S, C> {
    store: Arc<S>,
    cache: CacheService<C>,
    config: ServiceConfig,
}

impl<S: Store, C: KvCache> AssistantService<S, C> {
    /// Create an assistant service.
    #[must_use]
    pub fn new(store: Arc<S>, kv: Arc<C>, config: ServiceConfig) -> Self {
        Self {
            store,
            cache: CacheService::new(kv),
            config,
        }
    }

    /// Create a custom assistant for a user.
    ///
    /// `chunks_count` is derived from the knowledge filename list at
    /// creation and not maintained afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn create_custom_ai(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
        knowledge_files: Vec<String>,
        blob_urls: Vec<String>,
    ) -> Result<CustomAi> {
        let now = Utc::now();
        let chunks_count = u32::try_from(knowledge_files.len()).unwrap_or(u32::MAX);
        let ai = CustomAi {
            ai_id: AiId::generate(),
            user_id,
            name: name.to_string(),
            description: description.to_string(),
            knowledge_files,
            blob_urls,
            chunks_count,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put_ai(&ai)?;

        self.cache.del(&keys::user(&user_id)).await;
        self.cache.del(&keys::user_ais(&user_id)).await;

        tracing::info!(
            ai_id = %ai.ai_id,
            user_id = %user_id,
            chunks_count,
            "Created custom assistant"
        );

        Ok(ai)
    }

    /// List a user's active assistants, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_ais(&self, user_id: &UserId) -> Result<Vec<AiSummary>> {
        let key = keys::user_ais(user_id);
        if let Some(cached) = self.cache.get::<Vec<AiSummary>>(&key).await {
            return Ok(cached);
        }

        let mut ais: Vec<CustomAi> = self
            .store
            .list_ais_by_user(user_id)?
            .into_iter()
            .filter(|ai| ai.is_active)
            .collect();
        ais.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let instances = self.store.list_rag_instances_by_user(user_id)?;
        let conversations = self.store.list_conversations_by_user(user_id)?;

        let summaries: Vec<AiSummary> = ais
            .iter()
            .map(|ai| {
                let rag_instance = instances
                    .iter()
                    .find(|i| i.ai_id == Some(ai.ai_id) && i.status == RagStatus::Active)
                    .map(RagSummary::from);
                let conversation_count = conversations
                    .iter()
                    .filter(|c| c.is_active && c.ai_id == Some(ai.ai_id))
                    .count() as u64;
                AiSummary {
                    ai_id: ai.ai_id,
                    name: ai.name.clone(),
                    description: ai.description.clone(),
                    chunks_count: ai.chunks_count,
                    created_at: ai.created_at,
                    updated_at: ai.updated_at,
                    rag_instance,
                    conversation_count,
                }
            })
            .collect();

        self.cache
            .set(&key, &summaries, self.config.ai_list_ttl_secs)
            .await;

        Ok(summaries)
    }

    /// Fetch one of the user's assistants with its ingested files.
    ///
    /// Returns `None` when the assistant is absent, soft-deleted, or
    /// owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_ai_by_id(
        &self,
        user_id: &UserId,
        ai_id: &AiId,
    ) -> Result<Option<AssistantDetail>> {
        let Some(ai) = self.store.get_ai(ai_id)? else {
            return Ok(None);
        };
        if ai.user_id != *user_id || !ai.is_active {
            return Ok(None);
        }

        let instance = self
            .store
            .list_rag_instances_by_user(user_id)?
            .into_iter()
            .find(|i| i.ai_id == Some(ai.ai_id) && i.status == RagStatus::Active);

        let processed_files = match &instance {
            Some(instance) => self
                .store
                .list_knowledge_files_by_instance(&instance.instance_id)?
                .iter()
                .filter(|f| f.processing_status == ProcessingStatus::Processed)
                .map(KnowledgeFileSummary::from)
                .collect(),
            None => Vec::new(),
        };

        let conversation_count = self
            .store
            .list_conversations_by_user(user_id)?
            .iter()
            .filter(|c| c.is_active && c.ai_id == Some(ai.ai_id))
            .count() as u64;

        Ok(Some(AssistantDetail {
            rag_instance: instance.as_ref().map(RagSummary::from),
            processed_files,
            conversation_count,
            ai,
        }))
    }

    /// Soft-delete one of the user's assistants.
    ///
    /// The row and its blob URLs survive for the administrative bypass;
    /// only visibility changes.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the assistant is absent,
    /// already deleted, or owned by someone else, or a storage error.
    pub async fn delete_custom_ai(&self, user_id: &UserId, ai_id: &AiId) -> Result<()> {
        let mut ai = self.store.get_ai(ai_id)?.ok_or(ServiceError::NotFound)?;
        if ai.user_id != *user_id || !ai.is_active {
            return Err(ServiceError::NotFound);
        }

        ai.is_active = false;
        ai.updated_at = Utc::now();
        self.store.put_ai(&ai)?;

        self.cache.del(&keys::user_ais(user_id)).await;
        self.cache.del(&keys::user(user_id)).await;

        tracing::info!(ai_id = %ai_id, user_id = %user_id, "Deleted custom assistant");
        Ok(())
    }
}
