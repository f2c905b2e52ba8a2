//! Service layer for the sage platform.
//!
//! Each service coordinates the system of record (`sage-store`), the TTL
//! cache (`sage-cache`), and the object store (`sage-blob`) for one slice
//! of the domain. Services are generic over the backend traits and take
//! their clients as explicitly injected `Arc`s; nothing in this crate
//! holds global state.
//!
//! Two rules hold everywhere:
//!
//! - The store is authoritative. Cache entries are derived data with
//!   write-then-invalidate maintenance; a cache outage degrades reads to
//!   the store path and is never an error.
//! - Every operation is scoped to a resolved [`sage_core::UserId`].
//!   Resolving a bearer token is [`SessionService::get_session`]; its
//!   `None` is the authorization-failure signal. Scoped reads return
//!   `None`, and scoped writes `ServiceError::NotFound`, identically for
//!   "absent" and "not yours".

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod knowledge;
pub mod password;
pub mod rag;
pub mod session;
pub mod stats;
pub mod types;
pub mod upload;
pub mod user;

pub use assistant::AssistantService;
pub use config::ServiceConfig;
pub use conversation::ConversationService;
pub use error::{Result, ServiceError};
pub use knowledge::KnowledgeFileService;
pub use password::{validate_password, PasswordStrength, PasswordValidation};
pub use rag::RagService;
pub use session::SessionService;
pub use stats::StatsService;
pub use types::{
    AiSummary, AssistantBrief, AssistantDetail, CachedSession, ConversationDetail,
    ConversationSummary, CreateKnowledgeFile, CreateRagInstance, FileOutcome,
    KnowledgeFileSummary, MessagePreview, PublicUser, RagInstanceDetail, RagSummary,
    UserKnowledgeFile, UserProfile,
};
pub use upload::FileService;
pub use user::UserService;
