//! Digest helpers for emails and bearer tokens.
//!
//! The platform never stores raw bearer tokens, and user-facing surfaces
//! identify accounts by a short non-reversible hash rather than the email
//! itself. Both digests are blake3-based and hex-encoded.

/// Length of the email display hash in hex characters.
const EMAIL_HASH_LEN: usize = 12;

/// Derive the short display hash of an email address.
///
/// The hash is the first 12 hex characters of the blake3 digest of the
/// lowercased email. It is used for display and lookup without exposing
/// the address, and is not reversible.
#[must_use]
pub fn email_hash(email: &str) -> String {
    let digest = blake3::hash(email.to_lowercase().as_bytes());
    let mut hex = hex::encode(digest.as_bytes());
    hex.truncate(EMAIL_HASH_LEN);
    hex
}

/// Hash a raw bearer token for storage and cache keying.
///
/// Sessions are keyed by this value; the raw token never reaches the
/// store or the cache.
#[must_use]
pub fn token_hash(token: &str) -> String {
    hex::encode(blake3::hash(token.as_bytes()).as_bytes())
}
