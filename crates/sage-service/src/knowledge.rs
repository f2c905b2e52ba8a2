//! Knowledge-file bookkeeping.
//!
//! Files are registered as `Pending` when uploaded and finalized exactly
//! once by the ingestion collaborator. The rows are immutable after
//! finalization.

use std::sync::Arc;

use chrono::Utc;
use sage_core::{KnowledgeFileId, RagInstanceId, UserId};
use sage_store::{KnowledgeFile, ProcessingStatus, Store};

use crate::error::{Result, ServiceError};
use crate::types::{CreateKnowledgeFile, FileOutcome, UserKnowledgeFile};

/// Knowledge-file registration and finalization.
pub struct KnowledgeFileService<S> {
    store: Arc<S>,
}

impl<S: Store> KnowledgeFileService<S> {
    /// Create a knowledge-file service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register an uploaded source file as pending ingestion.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn create_knowledge_file(
        &self,
        request: CreateKnowledgeFile,
    ) -> Result<KnowledgeFile> {
        let file = KnowledgeFile {
            file_id: KnowledgeFileId::generate(),
            user_id: request.user_id,
            rag_instance_id: request.rag_instance_id,
            filename: request.filename,
            original_name: request.original_name,
            file_type: request.file_type,
            file_size: request.file_size,
            blob_url: request.blob_url,
            processing_status: ProcessingStatus::Pending,
            token_count: 0,
            extracted_text: None,
            processed_at: None,
            created_at: Utc::now(),
        };
        self.store.put_knowledge_file(&file)?;

        tracing::info!(
            file_id = %file.file_id,
            rag_instance_id = %file.rag_instance_id,
            "Registered knowledge file"
        );

        Ok(file)
    }

    /// Finalize a pending file with its ingestion outcome.
    ///
    /// `processed_at` is set only on success.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the file does not exist,
    /// `ServiceError::AlreadyFinalized` if it already left the pending
    /// state, or a storage error.
    pub async fn update_knowledge_file_status(
        &self,
        file_id: &KnowledgeFileId,
        outcome: FileOutcome,
        extracted_text: Option<String>,
        token_count: u64,
    ) -> Result<KnowledgeFile> {
        let mut file = self
            .store
            .get_knowledge_file(file_id)?
            .ok_or(ServiceError::NotFound)?;

        if file.processing_status != ProcessingStatus::Pending {
            return Err(ServiceError::AlreadyFinalized(*file_id));
        }

        file.processing_status = outcome.as_status();
        file.extracted_text = extracted_text;
        file.token_count = token_count;
        if outcome == FileOutcome::Processed {
            file.processed_at = Some(Utc::now());
        }
        self.store.put_knowledge_file(&file)?;

        tracing::info!(
            file_id = %file_id,
            outcome = ?outcome,
            token_count,
            "Finalized knowledge file"
        );

        Ok(file)
    }

    /// List an instance's files, newest first, in every status.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_knowledge_files(
        &self,
        rag_instance_id: &RagInstanceId,
    ) -> Result<Vec<KnowledgeFile>> {
        let mut files = self.store.list_knowledge_files_by_instance(rag_instance_id)?;
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    /// List everything a user has uploaded, newest first, annotated with
    /// the owning instance's name and type.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_user_knowledge_files(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserKnowledgeFile>> {
        let mut files = self.store.list_knowledge_files_by_user(user_id)?;
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut annotated = Vec::with_capacity(files.len());
        for file in files {
            let instance = self.store.get_rag_instance(&file.rag_instance_id)?;
            annotated.push(UserKnowledgeFile {
                rag_name: instance.as_ref().map(|i| i.name.clone()),
                rag_ai_type: instance.map(|i| i.ai_type),
                file,
            });
        }
        Ok(annotated)
    }
}
