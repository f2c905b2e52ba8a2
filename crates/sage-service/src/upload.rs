//! File uploads to the object store.
//!
//! Uploads propagate failure: a lost blob is lost data. Deletes and
//! listings degrade instead, logging and carrying on.

use std::sync::Arc;

use chrono::Utc;
use sage_blob::{paths, BlobInfo, ObjectStore};
use sage_core::{AiId, UserId};

use crate::error::Result;

/// Upload, delete, and list user files.
pub struct FileService<B> {
    blobs: Arc<B>,
}

impl<B: ObjectStore> FileService<B> {
    /// Create a file service.
    #[must_use]
    pub fn new(blobs: Arc<B>) -> Self {
        Self { blobs }
    }

    /// Upload a file under the user's namespace, returning its durable
    /// URL. Files without an assistant land in the `general` segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    pub async fn upload_file(
        &self,
        user_id: &UserId,
        ai_id: Option<&AiId>,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let path = paths::upload_path(user_id, ai_id, original_name, Utc::now().timestamp_millis());
        let size = bytes.len();
        let url = self.blobs.put(&path, bytes).await?;

        tracing::info!(user_id = %user_id, path, size, "Uploaded file");
        Ok(url)
    }

    /// Upload an ingestion source file under the assistant's knowledge
    /// segment, returning its durable URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    pub async fn upload_knowledge_file(
        &self,
        user_id: &UserId,
        ai_id: &AiId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let path = paths::knowledge_path(user_id, ai_id, filename, Utc::now().timestamp_millis());
        let size = bytes.len();
        let url = self.blobs.put(&path, bytes).await?;

        tracing::info!(user_id = %user_id, ai_id = %ai_id, path, size, "Uploaded knowledge file");
        Ok(url)
    }

    /// Delete a blob by its durable URL. Best-effort: failures are
    /// logged and swallowed.
    pub async fn delete_file(&self, url: &str) {
        if let Err(e) = self.blobs.delete(url).await {
            tracing::warn!(url, error = %e, "File deletion failed");
        }
    }

    /// List a user's blobs, optionally narrowed to a sub-prefix within
    /// their namespace. Degrades to an empty listing on backend failure.
    pub async fn list_user_files(
        &self,
        user_id: &UserId,
        sub_prefix: Option<&str>,
    ) -> Vec<BlobInfo> {
        let mut prefix = paths::user_prefix(user_id);
        if let Some(sub) = sub_prefix {
            prefix.push_str(sub);
        }

        match self.blobs.list(&prefix).await {
            Ok(blobs) => blobs,
            Err(e) => {
                tracing::warn!(user_id = %user_id, prefix, error = %e, "File listing failed");
                Vec::new()
            }
        }
    }
}
