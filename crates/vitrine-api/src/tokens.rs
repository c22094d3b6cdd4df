//! Opaque bearer tokens, one row per live session.
//!
//! The plaintext token is returned to the client exactly once; only its
//! SHA-256 digest is persisted. A user may hold any number of concurrent
//! tokens (multi-device); logout revokes all of them in one statement.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use vitrine_db::Database;
use vitrine_db::models::UserRow;

const TOKEN_LEN: usize = 48;

/// Fresh unguessable token string from the thread RNG.
pub fn generate() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Digest stored in place of the plaintext token.
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issue a new token bound to `user_id` and return the plaintext.
/// Blocking; call from `spawn_blocking`.
pub fn issue(db: &Database, user_id: &str) -> anyhow::Result<String> {
    let token = generate();
    db.insert_token(&Uuid::new_v4().to_string(), user_id, &digest(&token))?;
    Ok(token)
}

/// Resolve a presented token to its user. `None` covers both never-issued
/// and revoked tokens; a revoked token is never accepted again.
pub fn resolve(db: &Database, token: &str) -> anyhow::Result<Option<UserRow>> {
    db.get_user_by_token_hash(&digest(token))
}

/// Revoke every token the user holds. Returns the number revoked.
pub fn revoke_all(db: &Database, user_id: &str) -> anyhow::Result<usize> {
    db.delete_tokens_for_user(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_long_and_distinct() {
        let a = generate();
        let b = generate();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_and_not_the_token() {
        let token = generate();
        assert_eq!(digest(&token), digest(&token));
        assert_ne!(digest(&token), token);
    }

    #[test]
    fn issue_resolve_revoke_cycle() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&vitrine_db::queries::NewUser {
            id: "u1",
            name: "Tester",
            email: "a@x.com",
            password_hash: "$argon2id$fake",
            phone: None,
            street: None,
            zip: None,
            city: None,
            country: None,
        })
        .unwrap();

        let first = issue(&db, "u1").unwrap();
        let second = issue(&db, "u1").unwrap();
        assert_eq!(resolve(&db, &first).unwrap().unwrap().id, "u1");
        assert_eq!(resolve(&db, &second).unwrap().unwrap().id, "u1");

        assert_eq!(revoke_all(&db, "u1").unwrap(), 2);
        assert!(resolve(&db, &first).unwrap().is_none());
        assert!(resolve(&db, &second).unwrap().is_none());
    }
}
