//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use sage_core::{AiId, ConversationId, KnowledgeFileId, RagInstanceId, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{
    Conversation, CustomAi, KnowledgeFile, Message, RagInstance, SessionRecord, SystemStats, User,
};
use crate::Store;

/// RocksDB-backed system of record.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_row<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect the index-key suffix ids under a prefix scan.
    fn scan_index(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut matched = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }

            matched.push(key);
        }

        Ok(matched)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn insert_user(&self, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;

        let email_key = keys::email_key(&user.email);
        let existing = self
            .db
            .get_cf(&cf_by_email, &email_key)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if existing.is_some() {
            return Err(StoreError::Conflict(user.email.to_lowercase()));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, keys::user_key(&user.user_id), Self::serialize(user)?);
        batch.put_cf(&cf_by_email, &email_key, user.user_id.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn put_user(&self, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;

        // Email is immutable, so rewriting the index is idempotent
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, keys::user_key(&user.user_id), Self::serialize(user)?);
        batch.put_cf(&cf_by_email, keys::email_key(&user.email), user.user_id.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get_row(cf::USERS, &keys::user_key(user_id))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;

        let Some(id_bytes) = self
            .db
            .get_cf(&cf_by_email, keys::email_key(email))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = id_bytes
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Database("corrupt email index entry".to_string()))?;
        self.get_user(&UserId::from_uuid(uuid::Uuid::from_bytes(bytes)))
    }

    fn count_active_users(&self) -> Result<u64> {
        let cf = self.cf(cf::USERS)?;

        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let user: User = Self::deserialize(&value)?;
            if user.is_active {
                count += 1;
            }
        }

        Ok(count)
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    fn put_session(&self, session: &SessionRecord) -> Result<()> {
        let cf = self.cf(cf::SESSIONS)?;
        let key = keys::session_key(&session.token_hash);

        self.db
            .put_cf(&cf, key, Self::serialize(session)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        self.get_row(cf::SESSIONS, &keys::session_key(token_hash))
    }

    fn deactivate_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let cf = self.cf(cf::SESSIONS)?;

        let mut batch = WriteBatch::default();
        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let mut session: SessionRecord = Self::deserialize(&value)?;

            if session.is_active && session.is_expired(now) {
                session.is_active = false;
                batch.put_cf(&cf, key, Self::serialize(&session)?);
                count += 1;
            }
        }

        if count > 0 {
            self.db
                .write(batch)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(count)
    }

    // =========================================================================
    // Custom Assistant Operations
    // =========================================================================

    fn put_ai(&self, ai: &CustomAi) -> Result<()> {
        let cf_ais = self.cf(cf::AIS)?;
        let cf_by_user = self.cf(cf::AIS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_ais, keys::ai_key(&ai.ai_id), Self::serialize(ai)?);
        batch.put_cf(&cf_by_user, keys::user_ai_key(&ai.user_id, &ai.ai_id), []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_ai(&self, ai_id: &AiId) -> Result<Option<CustomAi>> {
        self.get_row(cf::AIS, &keys::ai_key(ai_id))
    }

    fn list_ais_by_user(&self, user_id: &UserId) -> Result<Vec<CustomAi>> {
        let index_keys = self.scan_index(cf::AIS_BY_USER, &keys::user_prefix(user_id))?;

        let mut ais = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let ai_id = keys::extract_ai_id(&key);
            if let Some(ai) = self.get_ai(&ai_id)? {
                ais.push(ai);
            }
        }

        Ok(ais)
    }

    fn count_active_ais(&self) -> Result<u64> {
        let cf = self.cf(cf::AIS)?;

        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let ai: CustomAi = Self::deserialize(&value)?;
            if ai.is_active {
                count += 1;
            }
        }

        Ok(count)
    }

    // =========================================================================
    // Retrieval-Index Instance Operations
    // =========================================================================

    fn put_rag_instance(&self, instance: &RagInstance) -> Result<()> {
        let cf_instances = self.cf(cf::RAG_INSTANCES)?;
        let cf_by_type = self.cf(cf::RAG_INSTANCES_BY_TYPE)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_instances,
            keys::rag_instance_key(&instance.instance_id),
            Self::serialize(instance)?,
        );
        batch.put_cf(
            &cf_by_type,
            keys::type_rag_instance_key(&instance.ai_type, &instance.instance_id),
            [],
        );
        if let Some(user_id) = &instance.user_id {
            let cf_by_user = self.cf(cf::RAG_INSTANCES_BY_USER)?;
            batch.put_cf(
                &cf_by_user,
                keys::user_rag_instance_key(user_id, &instance.instance_id),
                [],
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_rag_instance(&self, instance_id: &RagInstanceId) -> Result<Option<RagInstance>> {
        self.get_row(cf::RAG_INSTANCES, &keys::rag_instance_key(instance_id))
    }

    fn list_rag_instances_by_user(&self, user_id: &UserId) -> Result<Vec<RagInstance>> {
        let index_keys =
            self.scan_index(cf::RAG_INSTANCES_BY_USER, &keys::user_prefix(user_id))?;

        let mut instances = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let instance_id = keys::extract_rag_instance_id(&key);
            if let Some(instance) = self.get_rag_instance(&instance_id)? {
                instances.push(instance);
            }
        }

        Ok(instances)
    }

    fn list_rag_instances_by_type(&self, ai_type: &str) -> Result<Vec<RagInstance>> {
        let index_keys = self.scan_index(cf::RAG_INSTANCES_BY_TYPE, &keys::type_prefix(ai_type))?;

        let mut instances = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let instance_id = keys::extract_rag_instance_id(&key);
            if let Some(instance) = self.get_rag_instance(&instance_id)? {
                instances.push(instance);
            }
        }

        Ok(instances)
    }

    // =========================================================================
    // Knowledge File Operations
    // =========================================================================

    fn put_knowledge_file(&self, file: &KnowledgeFile) -> Result<()> {
        let cf_files = self.cf(cf::KNOWLEDGE_FILES)?;
        let cf_by_instance = self.cf(cf::KNOWLEDGE_FILES_BY_INSTANCE)?;
        let cf_by_user = self.cf(cf::KNOWLEDGE_FILES_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_files,
            keys::knowledge_file_key(&file.file_id),
            Self::serialize(file)?,
        );
        batch.put_cf(
            &cf_by_instance,
            keys::instance_file_key(&file.rag_instance_id, &file.file_id),
            [],
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_file_key(&file.user_id, &file.file_id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_knowledge_file(&self, file_id: &KnowledgeFileId) -> Result<Option<KnowledgeFile>> {
        self.get_row(cf::KNOWLEDGE_FILES, &keys::knowledge_file_key(file_id))
    }

    fn list_knowledge_files_by_instance(
        &self,
        instance_id: &RagInstanceId,
    ) -> Result<Vec<KnowledgeFile>> {
        let index_keys = self.scan_index(
            cf::KNOWLEDGE_FILES_BY_INSTANCE,
            &keys::rag_instance_prefix(instance_id),
        )?;

        let mut files = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let file_id = keys::extract_knowledge_file_id(&key);
            if let Some(file) = self.get_knowledge_file(&file_id)? {
                files.push(file);
            }
        }

        Ok(files)
    }

    fn list_knowledge_files_by_user(&self, user_id: &UserId) -> Result<Vec<KnowledgeFile>> {
        let index_keys =
            self.scan_index(cf::KNOWLEDGE_FILES_BY_USER, &keys::user_prefix(user_id))?;

        let mut files = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let file_id = keys::extract_knowledge_file_id(&key);
            if let Some(file) = self.get_knowledge_file(&file_id)? {
                files.push(file);
            }
        }

        Ok(files)
    }

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        let cf_conversations = self.cf(cf::CONVERSATIONS)?;
        let cf_by_user = self.cf(cf::CONVERSATIONS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_conversations,
            keys::conversation_key(&conversation.conversation_id),
            Self::serialize(conversation)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_conversation_key(&conversation.user_id, &conversation.conversation_id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>> {
        self.get_row(cf::CONVERSATIONS, &keys::conversation_key(conversation_id))
    }

    fn list_conversations_by_user(&self, user_id: &UserId) -> Result<Vec<Conversation>> {
        let index_keys =
            self.scan_index(cf::CONVERSATIONS_BY_USER, &keys::user_prefix(user_id))?;

        let mut conversations = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let conversation_id = keys::extract_conversation_id(&key);
            if let Some(conversation) = self.get_conversation(&conversation_id)? {
                conversations.push(conversation);
            }
        }

        Ok(conversations)
    }

    // =========================================================================
    // Message Operations
    // =========================================================================

    fn put_message(&self, message: &Message) -> Result<()> {
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_conversation = self.cf(cf::MESSAGES_BY_CONVERSATION)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_messages,
            keys::message_key(&message.message_id),
            Self::serialize(message)?,
        );
        batch.put_cf(
            &cf_by_conversation,
            keys::conversation_message_key(
                &message.conversation_id,
                message.created_at.timestamp_millis(),
                &message.message_id,
            ),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let index_keys = self.scan_index(
            cf::MESSAGES_BY_CONVERSATION,
            &keys::conversation_prefix(conversation_id),
        )?;

        let mut messages = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let message_id = keys::extract_message_id(&key);
            if let Some(message) =
                self.get_row::<Message>(cf::MESSAGES, &keys::message_key(&message_id))?
            {
                messages.push(message);
            }
        }

        Ok(messages)
    }

    fn last_message(&self, conversation_id: &ConversationId) -> Result<Option<Message>> {
        // The ordering index is ascending, so the last prefix match wins
        let index_keys = self.scan_index(
            cf::MESSAGES_BY_CONVERSATION,
            &keys::conversation_prefix(conversation_id),
        )?;

        match index_keys.last() {
            Some(key) => {
                let message_id = keys::extract_message_id(key);
                self.get_row(cf::MESSAGES, &keys::message_key(&message_id))
            }
            None => Ok(None),
        }
    }

    fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64> {
        let index_keys = self.scan_index(
            cf::MESSAGES_BY_CONVERSATION,
            &keys::conversation_prefix(conversation_id),
        )?;
        Ok(index_keys.len() as u64)
    }

    fn count_all_messages(&self) -> Result<u64> {
        let cf = self.cf(cf::MESSAGES)?;

        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }

        Ok(count)
    }

    // =========================================================================
    // Stats Operations
    // =========================================================================

    fn put_system_stats(&self, stats: &SystemStats) -> Result<()> {
        let cf = self.cf(cf::SYSTEM_STATS)?;

        self.db
            .put_cf(&cf, keys::stats_key(stats.date), Self::serialize(stats)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn latest_system_stats(&self) -> Result<Option<SystemStats>> {
        let cf = self.cf(cf::SYSTEM_STATS)?;

        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(item) => {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(Some(Self::deserialize(&value)?))
            }
            None => Ok(None),
        }
    }
}
