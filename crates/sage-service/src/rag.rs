//! Retrieval-index instance service.
//!
//! An instance ties an assistant type (and optionally an owner and a
//! custom assistant) to the blob triple holding its serialized knowledge
//! graph, vector index, and configuration. Deletion is a status
//! transition: the blob deletes are best-effort and the row always moves
//! to `Deleted`, so an unreachable object store degrades to orphaned
//! blobs rather than a still-servable index.

use std::sync::Arc;

use chrono::Utc;
use sage_blob::ObjectStore;
use sage_cache::{keys, CacheService, KvCache};
use sage_core::{AiId, RagInstanceId, UserId};
use sage_store::{ProcessingStatus, RagInstance, RagStatus, Store};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::types::{CreateRagInstance, KnowledgeFileSummary, RagInstanceDetail};

/// Retrieval-index lifecycle management.
pub struct RagService<S, C, B> {
    store: Arc<S>,
    cache: CacheService<C>,
    blobs: Arc<B>,
    config: ServiceConfig,
}

impl<S: Store, C: KvCache, B: ObjectStore> RagService<S, C, B> {
    /// Create a retrieval-index service.
    #[must_use]
    pub fn new(store: Arc<S>, kv: Arc<C>, blobs: Arc<B>, config: ServiceConfig) -> Self {
        Self {
            store,
            cache: CacheService::new(kv),
            blobs,
            config,
        }
    }

    /// Register a freshly built index.
    ///
    /// The blob triple must already be uploaded; this only records it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn create_rag_instance(&self, request: CreateRagInstance) -> Result<RagInstance> {
        let now = Utc::now();
        let instance = RagInstance {
            instance_id: RagInstanceId::generate(),
            ai_type: request.ai_type,
            user_id: request.user_id,
            ai_id: request.ai_id,
            name: request.name,
            description: request.description,
            graph_blob_url: request.graph_blob_url,
            vector_blob_url: request.vector_blob_url,
            config_blob_url: request.config_blob_url,
            total_chunks: request.total_chunks,
            total_tokens: request.total_tokens,
            file_count: request.file_count,
            status: RagStatus::Active,
            processing_log: None,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        };
        self.store.put_rag_instance(&instance)?;

        if let Some(user_id) = &instance.user_id {
            self.cache.del(&keys::user_rag_instances(user_id)).await;
        }

        tracing::info!(
            instance_id = %instance.instance_id,
            ai_type = %instance.ai_type,
            file_count = instance.file_count,
            "Created retrieval-index instance"
        );

        Ok(instance)
    }

    /// Resolve the active instance for an exact (type, owner, assistant)
    /// scope. `None` owner and assistant match only the shared built-in
    /// instance of that type.
    ///
    /// A hit touches `last_accessed_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_rag_instance(
        &self,
        ai_type: &str,
        user_id: Option<UserId>,
        ai_id: Option<AiId>,
    ) -> Result<Option<RagInstanceDetail>> {
        let Some(mut instance) = self
            .store
            .list_rag_instances_by_type(ai_type)?
            .into_iter()
            .find(|i| i.user_id == user_id && i.ai_id == ai_id && i.status == RagStatus::Active)
        else {
            return Ok(None);
        };

        instance.last_accessed_at = Utc::now();
        self.store.put_rag_instance(&instance)?;

        let processed_files = self.processed_files(&instance.instance_id)?;
        Ok(Some(RagInstanceDetail {
            instance,
            processed_files,
        }))
    }

    /// List a user's active instances, newest first, with their ingested
    /// files.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_rag_instances(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RagInstanceDetail>> {
        let key = keys::user_rag_instances(user_id);
        if let Some(cached) = self.cache.get::<Vec<RagInstanceDetail>>(&key).await {
            return Ok(cached);
        }

        let mut instances: Vec<RagInstance> = self
            .store
            .list_rag_instances_by_user(user_id)?
            .into_iter()
            .filter(|i| i.status == RagStatus::Active)
            .collect();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut details = Vec::with_capacity(instances.len());
        for instance in instances {
            let processed_files = self.processed_files(&instance.instance_id)?;
            details.push(RagInstanceDetail {
                instance,
                processed_files,
            });
        }

        self.cache
            .set(&key, &details, self.config.rag_list_ttl_secs)
            .await;

        Ok(details)
    }

    /// Record a status transition reported by the ingestion collaborator.
    ///
    /// An existing processing log is kept unless a new one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the instance does not exist,
    /// or a storage error.
    pub async fn update_rag_instance_status(
        &self,
        instance_id: &RagInstanceId,
        status: RagStatus,
        processing_log: Option<String>,
    ) -> Result<RagInstance> {
        let mut instance = self
            .store
            .get_rag_instance(instance_id)?
            .ok_or(ServiceError::NotFound)?;

        instance.status = status;
        if processing_log.is_some() {
            instance.processing_log = processing_log;
        }
        instance.updated_at = Utc::now();
        self.store.put_rag_instance(&instance)?;

        tracing::info!(
            instance_id = %instance_id,
            status = ?status,
            "Updated retrieval-index status"
        );

        Ok(instance)
    }

    /// Tear down an instance: delete its blob triple best-effort, then
    /// mark the row `Deleted`.
    ///
    /// Blob failures are logged and do not block the status transition.
    /// Deleting an unknown instance is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn delete_rag_instance(&self, instance_id: &RagInstanceId) -> Result<()> {
        let Some(mut instance) = self.store.get_rag_instance(instance_id)? else {
            return Ok(());
        };

        for url in [
            instance.graph_blob_url.clone(),
            instance.vector_blob_url.clone(),
            instance.config_blob_url.clone(),
        ] {
            if let Err(e) = self.blobs.delete(&url).await {
                tracing::warn!(instance_id = %instance_id, url, error = %e, "Blob delete failed");
            }
        }

        instance.status = RagStatus::Deleted;
        instance.updated_at = Utc::now();
        self.store.put_rag_instance(&instance)?;

        if let Some(user_id) = &instance.user_id {
            self.cache.del(&keys::user_rag_instances(user_id)).await;
        }

        tracing::info!(instance_id = %instance_id, "Deleted retrieval-index instance");
        Ok(())
    }

    fn processed_files(&self, instance_id: &RagInstanceId) -> Result<Vec<KnowledgeFileSummary>> {
        Ok(self
            .store
            .list_knowledge_files_by_instance(instance_id)?
            .iter()
            .filter(|f| f.processing_status == ProcessingStatus::Processed)
            .map(KnowledgeFileSummary::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_blob::MemoryObjectStore;
    use sage_cache::MemoryKv;
    use sage_store::RocksStore;
    use tempfile::TempDir;

    type Fixture = (
        TempDir,
        Arc<RocksStore>,
        Arc<MemoryObjectStore>,
        RagService<RocksStore, MemoryKv, MemoryObjectStore>,
    );

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let blobs = Arc::new(MemoryObjectStore::new());
        let service = RagService::new(
            Arc::clone(&store),
            Arc::new(MemoryKv::new()),
            Arc::clone(&blobs),
            ServiceConfig::default(),
        );
        (dir, store, blobs, service)
    }

    async fn seeded_instance(
        blobs: &MemoryObjectStore,
        service: &RagService<RocksStore, MemoryKv, MemoryObjectStore>,
        user_id: Option<UserId>,
        ai_id: Option<AiId>,
    ) -> RagInstance {
        let graph = blobs.put("idx/graph.bin", b"g".to_vec()).await.unwrap();
        let vector = blobs.put("idx/vector.bin", b"v".to_vec()).await.unwrap();
        let config = blobs.put("idx/config.json", b"c".to_vec()).await.unwrap();

        service
            .create_rag_instance(CreateRagInstance {
                ai_type: "custom".to_string(),
                user_id,
                ai_id,
                name: "Tutor index".to_string(),
                description: None,
                graph_blob_url: graph,
                vector_blob_url: vector,
                config_blob_url: config,
                total_chunks: 10,
                total_tokens: 5000,
                file_count: 2,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn scoped_lookup_matches_exactly() {
        let (_dir, _store, blobs, service) = fixture();
        let user_id = UserId::generate();
        let ai_id = AiId::generate();

        seeded_instance(&blobs, &service, Some(user_id), Some(ai_id)).await;

        // Exact scope resolves
        let found = service
            .get_rag_instance("custom", Some(user_id), Some(ai_id))
            .await
            .unwrap();
        assert!(found.is_some());

        // An unset owner is its own scope, not a wildcard
        assert!(service
            .get_rag_instance("custom", None, None)
            .await
            .unwrap()
            .is_none());
        assert!(service
            .get_rag_instance("custom", Some(UserId::generate()), Some(ai_id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lookup_touches_last_accessed() {
        let (_dir, store, blobs, service) = fixture();
        let created = seeded_instance(&blobs, &service, None, None).await;

        service.get_rag_instance("custom", None, None).await.unwrap();

        let row = store.get_rag_instance(&created.instance_id).unwrap().unwrap();
        assert!(row.last_accessed_at > created.last_accessed_at);
    }

    #[tokio::test]
    async fn deletion_removes_blobs_and_tombstones_the_row() {
        let (_dir, store, blobs, service) = fixture();
        let user_id = UserId::generate();
        let created = seeded_instance(&blobs, &service, Some(user_id), None).await;

        service.delete_rag_instance(&created.instance_id).await.unwrap();

        assert_eq!(blobs.delete_attempts().len(), 3);
        assert!(!blobs.contains_url(&created.graph_blob_url));

        let row = store.get_rag_instance(&created.instance_id).unwrap().unwrap();
        assert_eq!(row.status, RagStatus::Deleted);

        // Deleted instances disappear from scoped reads and listings
        assert!(service
            .get_rag_instance("custom", Some(user_id), None)
            .await
            .unwrap()
            .is_none());
        assert!(service.get_user_rag_instances(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deletion_survives_blob_outage() {
        let (_dir, store, blobs, service) = fixture();
        let created = seeded_instance(&blobs, &service, None, None).await;

        blobs.set_fail_deletes(true);
        service.delete_rag_instance(&created.instance_id).await.unwrap();

        // All three deletes were attempted; the row still transitioned
        assert_eq!(blobs.delete_attempts().len(), 3);
        let row = store.get_rag_instance(&created.instance_id).unwrap().unwrap();
        assert_eq!(row.status, RagStatus::Deleted);
        // The blobs are orphaned, a known gap
        assert!(blobs.contains_url(&created.graph_blob_url));
    }

    #[tokio::test]
    async fn deleting_unknown_instance_is_a_noop() {
        let (_dir, _store, _blobs, service) = fixture();
        service.delete_rag_instance(&RagInstanceId::generate()).await.unwrap();
    }

    #[tokio::test]
    async fn status_update_keeps_log_unless_replaced() {
        let (_dir, _store, blobs, service) = fixture();
        let created = seeded_instance(&blobs, &service, None, None).await;

        let updated = service
            .update_rag_instance_status(
                &created.instance_id,
                RagStatus::Error,
                Some("chunking failed".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.processing_log.as_deref(), Some("chunking failed"));

        let updated = service
            .update_rag_instance_status(&created.instance_id, RagStatus::Active, None)
            .await
            .unwrap();
        assert_eq!(updated.status, RagStatus::Active);
        assert_eq!(updated.processing_log.as_deref(), Some("chunking failed"));
    }

    #[tokio::test]
    async fn user_listing_is_newest_first() {
        let (_dir, _store, blobs, service) = fixture();
        let user_id = UserId::generate();

        seeded_instance(&blobs, &service, Some(user_id), None).await;
        let second = seeded_instance(&blobs, &service, Some(user_id), None).await;

        let listed = service.get_user_rag_instances(&user_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].instance.instance_id, second.instance_id);
    }
}
