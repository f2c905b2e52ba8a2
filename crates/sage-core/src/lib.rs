//! Core types and utilities for the sage platform.
//!
//! This crate provides the foundational types used throughout the sage
//! service layer:
//!
//! - **Identifiers**: Strongly-typed UUID ids for every stored entity
//! - **Digests**: The email display hash and bearer-token hashing
//!
//! # Example
//!
//! ```
//! use sage_core::{UserId, ConversationId, digest};
//!
//! // Generate entity ids
//! let user_id = UserId::generate();
//! let conversation_id = ConversationId::generate();
//!
//! // Derive the non-reversible display hash of an email
//! let hash = digest::email_hash("a@x.com");
//! assert_eq!(hash.len(), 12);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod digest;
pub mod ids;

pub use ids::{
    AiId, ConversationId, IdError, KnowledgeFileId, MessageId, RagInstanceId, UserId,
};
