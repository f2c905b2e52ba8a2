//! Object-store path construction.
//!
//! Paths are namespaced by `{userId}/{assistantId|general}/...`, so two
//! users' uploads can never collide and an assistant's artifacts can be
//! listed by prefix.

use sage_core::{AiId, UserId};

/// Path for a general upload: `{user}/{ai|general}/{millis}-{original}`.
#[must_use]
pub fn upload_path(
    user_id: &UserId,
    ai_id: Option<&AiId>,
    original_name: &str,
    timestamp_millis: i64,
) -> String {
    match ai_id {
        Some(ai_id) => format!("{user_id}/{ai_id}/{timestamp_millis}-{original_name}"),
        None => format!("{user_id}/general/{timestamp_millis}-{original_name}"),
    }
}

/// Path for a knowledge-ingestion source file:
/// `{user}/{ai}/knowledge/{millis}-{filename}`.
#[must_use]
pub fn knowledge_path(
    user_id: &UserId,
    ai_id: &AiId,
    filename: &str,
    timestamp_millis: i64,
) -> String {
    format!("{user_id}/{ai_id}/knowledge/{timestamp_millis}-{filename}")
}

/// Prefix covering everything a user has uploaded.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> String {
    format!("{user_id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_path_defaults_to_general() {
        let user_id = UserId::generate();
        let path = upload_path(&user_id, None, "notes.pdf", 1_700_000_000_000);
        assert_eq!(path, format!("{user_id}/general/1700000000000-notes.pdf"));
    }

    #[test]
    fn knowledge_path_nests_under_assistant() {
        let user_id = UserId::generate();
        let ai_id = AiId::generate();
        let path = knowledge_path(&user_id, &ai_id, "notes.pdf", 42);
        assert_eq!(path, format!("{user_id}/{ai_id}/knowledge/42-notes.pdf"));
        assert!(path.starts_with(&user_prefix(&user_id)));
    }
}
