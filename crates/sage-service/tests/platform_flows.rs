//! End-to-end flows across the service layer, with all services sharing
//! one store, one cache backend, and one object store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sage_blob::{MemoryObjectStore, ObjectStore};
use sage_cache::MemoryKv;
use sage_core::{digest, UserId};
use sage_service::{
    AssistantService, ConversationService, CreateKnowledgeFile, CreateRagInstance, FileOutcome,
    FileService, KnowledgeFileService, RagService, ServiceConfig, ServiceError, SessionService,
    StatsService, UserService,
};
use sage_store::{MessageRole, RagStatus, RocksStore, Store};
use tempfile::TempDir;

struct Platform {
    _dir: TempDir,
    store: Arc<RocksStore>,
    blobs: Arc<MemoryObjectStore>,
    users: UserService<RocksStore, MemoryKv>,
    sessions: SessionService<RocksStore, MemoryKv>,
    assistants: AssistantService<RocksStore, MemoryKv>,
    rag: RagService<RocksStore, MemoryKv, MemoryObjectStore>,
    knowledge: KnowledgeFileService<RocksStore>,
    files: FileService<MemoryObjectStore>,
    conversations: ConversationService<RocksStore, MemoryKv>,
    stats: StatsService<RocksStore>,
}

fn platform() -> Platform {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let kv = Arc::new(MemoryKv::new());
    let blobs = Arc::new(MemoryObjectStore::new());
    let config = ServiceConfig::default();

    Platform {
        users: UserService::new(Arc::clone(&store), Arc::clone(&kv), config),
        sessions: SessionService::new(Arc::clone(&store), Arc::clone(&kv)),
        assistants: AssistantService::new(Arc::clone(&store), Arc::clone(&kv), config),
        rag: RagService::new(
            Arc::clone(&store),
            Arc::clone(&kv),
            Arc::clone(&blobs),
            config,
        ),
        knowledge: KnowledgeFileService::new(Arc::clone(&store)),
        files: FileService::new(Arc::clone(&blobs)),
        conversations: ConversationService::new(Arc::clone(&store), Arc::clone(&kv), config),
        stats: StatsService::new(Arc::clone(&store)),
        store,
        blobs,
        _dir: dir,
    }
}

#[tokio::test]
async fn registration_conflicts_and_rate_limits() {
    let p = platform();

    let ann = p.users.register_user("ann@example.com", "Ann").await.unwrap();

    // Same email again is a conflict, also counting against the window
    let err = p.users.register_user("ann@example.com", "Ann").await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Attempts three through five exhaust the window
    for _ in 0..3 {
        let _ = p.users.register_user("ann@example.com", "Ann").await;
    }
    let err = p.users.register_user("ann@example.com", "Ann").await.unwrap_err();
    assert!(matches!(err, ServiceError::RateLimited { remaining: 0 }));

    // The account itself is intact
    let fetched = p.users.get_user_by_email("ann@example.com").await.unwrap();
    assert_eq!(fetched.unwrap().user_id, ann.user_id);
}

#[tokio::test]
async fn login_is_rate_limited_separately_from_registration() {
    let p = platform();

    p.users.register_user("ann@example.com", "Ann").await.unwrap();

    for n in 0..4 {
        assert!(
            p.users.check_login("ann@example.com").await.is_ok(),
            "login attempt {n} should pass"
        );
        p.users.record_failed_login("ann@example.com").await;
    }
    assert!(p.users.check_login("ann@example.com").await.is_ok());

    let err = p.users.check_login("ann@example.com").await.unwrap_err();
    assert_eq!(err.http_status_code(), 429);
}

#[tokio::test]
async fn session_lifecycle_end_to_end() {
    let p = platform();

    let ann = p.users.create_user("ann@example.com", "Ann").await.unwrap();
    let token_hash = digest::token_hash("raw-bearer-token");

    p.sessions
        .create_session(ann.user_id, &token_hash, Utc::now() + Duration::hours(24), None, None)
        .await
        .unwrap();

    // Resolves, and the resolved id loads the profile
    let resolved = p.sessions.get_session(&token_hash).await.unwrap().unwrap();
    let profile = p.users.get_user_by_id(&resolved).await.unwrap().unwrap();
    assert_eq!(profile.email, "ann@example.com");

    // Revocation is immediate on both paths
    p.sessions.invalidate_session(&token_hash).await.unwrap();
    assert_eq!(p.sessions.get_session(&token_hash).await.unwrap(), None);

    // An unknown token never resolves
    let other = digest::token_hash("other-token");
    assert_eq!(p.sessions.get_session(&other).await.unwrap(), None);
}

#[tokio::test]
async fn assistant_lifecycle_with_index_and_files() {
    let p = platform();

    let ann = p.users.create_user("ann@example.com", "Ann").await.unwrap();

    // Upload two source files, create the assistant over them
    let url_a = p
        .files
        .upload_file(&ann.user_id, None, "algebra.pdf", b"a".to_vec())
        .await
        .unwrap();
    let url_b = p
        .files
        .upload_file(&ann.user_id, None, "calculus.pdf", b"c".to_vec())
        .await
        .unwrap();
    let ai = p
        .assistants
        .create_custom_ai(
            ann.user_id,
            "Math Tutor",
            "Helps with math",
            vec!["algebra.pdf".to_string(), "calculus.pdf".to_string()],
            vec![url_a, url_b],
        )
        .await
        .unwrap();
    assert_eq!(ai.chunks_count, 2);

    // Register the built index and its ingested files
    let graph = p.blobs.put("idx/graph", b"g".to_vec()).await.unwrap();
    let vector = p.blobs.put("idx/vector", b"v".to_vec()).await.unwrap();
    let config = p.blobs.put("idx/config", b"c".to_vec()).await.unwrap();
    let instance = p
        .rag
        .create_rag_instance(CreateRagInstance {
            ai_type: "custom".to_string(),
            user_id: Some(ann.user_id),
            ai_id: Some(ai.ai_id),
            name: "Math Tutor index".to_string(),
            description: None,
            graph_blob_url: graph,
            vector_blob_url: vector,
            config_blob_url: config,
            total_chunks: 40,
            total_tokens: 20_000,
            file_count: 2,
        })
        .await
        .unwrap();

    let file = p
        .knowledge
        .create_knowledge_file(CreateKnowledgeFile {
            user_id: ann.user_id,
            rag_instance_id: instance.instance_id,
            filename: "stored-algebra.pdf".to_string(),
            original_name: "algebra.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            file_size: 1024,
            blob_url: "memory://k/algebra".to_string(),
        })
        .await
        .unwrap();
    p.knowledge
        .update_knowledge_file_status(&file.file_id, FileOutcome::Processed, None, 500)
        .await
        .unwrap();

    // The listing stitches everything together
    let listed = p.assistants.get_user_ais(&ann.user_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    let summary = &listed[0];
    assert_eq!(summary.rag_instance.as_ref().unwrap().instance_id, instance.instance_id);

    let detail = p
        .assistants
        .get_ai_by_id(&ann.user_id, &ai.ai_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.processed_files.len(), 1);
    assert_eq!(detail.processed_files[0].original_name, "algebra.pdf");

    // Soft-delete the assistant: listing empties, row survives
    p.assistants.delete_custom_ai(&ann.user_id, &ai.ai_id).await.unwrap();
    assert!(p.assistants.get_user_ais(&ann.user_id).await.unwrap().is_empty());
    assert!(!p.store.get_ai(&ai.ai_id).unwrap().unwrap().is_active);
}

#[tokio::test]
async fn index_teardown_survives_blob_outage() {
    let p = platform();

    let graph = p.blobs.put("idx/graph", b"g".to_vec()).await.unwrap();
    let vector = p.blobs.put("idx/vector", b"v".to_vec()).await.unwrap();
    let config = p.blobs.put("idx/config", b"c".to_vec()).await.unwrap();
    let instance = p
        .rag
        .create_rag_instance(CreateRagInstance {
            ai_type: "custom".to_string(),
            user_id: None,
            ai_id: None,
            name: "Shared index".to_string(),
            description: None,
            graph_blob_url: graph,
            vector_blob_url: vector,
            config_blob_url: config,
            total_chunks: 1,
            total_tokens: 1,
            file_count: 1,
        })
        .await
        .unwrap();

    p.blobs.set_fail_deletes(true);
    p.rag.delete_rag_instance(&instance.instance_id).await.unwrap();

    // All three deletes attempted, the index is still unservable
    assert_eq!(p.blobs.delete_attempts().len(), 3);
    assert_eq!(
        p.store.get_rag_instance(&instance.instance_id).unwrap().unwrap().status,
        RagStatus::Deleted
    );
    assert!(p.rag.get_rag_instance("custom", None, None).await.unwrap().is_none());
}

#[tokio::test]
async fn conversation_listing_tracks_activity_through_the_cache() {
    let p = platform();

    let ann = p.users.create_user("ann@example.com", "Ann").await.unwrap();
    let conversation = p
        .conversations
        .create_conversation(ann.user_id, "companion", None, None)
        .await
        .unwrap();

    // Populate the cached listing, then mutate
    assert_eq!(
        p.conversations.get_user_conversations(&ann.user_id).await.unwrap()[0].message_count,
        0
    );
    p.conversations
        .add_message(&conversation.conversation_id, MessageRole::User, "hi", None)
        .await
        .unwrap();

    // The mutation invalidated the cached listing
    let listed = p.conversations.get_user_conversations(&ann.user_id).await.unwrap();
    assert_eq!(listed[0].message_count, 1);
    assert_eq!(listed[0].last_message.as_ref().unwrap().content, "hi");
}

#[tokio::test]
async fn stats_snapshot_is_idempotent_per_day() {
    let p = platform();

    let ann = p.users.create_user("ann@example.com", "Ann").await.unwrap();
    p.users.create_user("bea@example.com", "Bea").await.unwrap();
    let conversation = p
        .conversations
        .create_conversation(ann.user_id, "companion", None, None)
        .await
        .unwrap();
    p.conversations
        .add_message(&conversation.conversation_id, MessageRole::User, "hi", None)
        .await
        .unwrap();

    let first = p.stats.update_system_stats().await.unwrap();
    let second = p.stats.update_system_stats().await.unwrap();
    assert_eq!(first.date, second.date);

    let latest = p.stats.get_system_stats().await.unwrap().unwrap();
    assert_eq!(latest.total_users, 2);
    assert_eq!(latest.total_ais, 0);
    assert_eq!(latest.total_messages, 1);
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let p = platform();

    let ann = p.users.create_user("ann@example.com", "Ann").await.unwrap();
    let bea = p.users.create_user("bea@example.com", "Bea").await.unwrap();

    let ai = p
        .assistants
        .create_custom_ai(ann.user_id, "Tutor", "", vec![], vec![])
        .await
        .unwrap();
    let conversation = p
        .conversations
        .create_conversation(ann.user_id, "custom", Some(ai.ai_id), None)
        .await
        .unwrap();

    // Bea sees none of Ann's resources
    assert!(p.assistants.get_user_ais(&bea.user_id).await.unwrap().is_empty());
    assert!(p
        .assistants
        .get_ai_by_id(&bea.user_id, &ai.ai_id)
        .await
        .unwrap()
        .is_none());
    assert!(p
        .conversations
        .get_conversation(&bea.user_id, &conversation.conversation_id)
        .await
        .unwrap()
        .is_none());

    // And cannot delete them either
    let err = p
        .assistants
        .delete_custom_ai(&bea.user_id, &ai.ai_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));

    // A user id that never registered resolves nothing
    assert!(p
        .users
        .get_user_by_id(&UserId::generate())
        .await
        .unwrap()
        .is_none());
}
