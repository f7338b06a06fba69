//! Identity gate: opaque bearer tokens resolved to role-tagged actors.
//!
//! Tokens are 32 random bytes, URL-safe base64. Only their SHA-256 is
//! persisted. The admin credential comes from configuration and is
//! compared in constant time.

use rusqlite::Connection;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::Role;

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    /// The configured administrator. There is one, with the nil id.
    pub fn admin() -> Self {
        Self {
            id: Uuid::nil(),
            role: Role::Admin,
        }
    }

    /// Label used in audit rows, e.g. `doctor:<uuid>`.
    pub fn audit_label(&self) -> String {
        format!("{}:{}", self.role, self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid or unknown credential")]
    InvalidCredential,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Mint and persist a token for `actor_id`. Returns the plaintext token,
/// which is never stored.
pub fn issue_token(conn: &Connection, actor_id: &Uuid, role: Role) -> Result<String, DatabaseError> {
    let token = generate_token();
    db::insert_access_token(conn, &hash_token(&token), actor_id, role)?;
    tracing::debug!(actor_id = %actor_id, role = %role, "Issued access token");
    Ok(token)
}

/// Resolve a presented token to its actor.
pub fn verify_caller(
    conn: &Connection,
    token: &str,
    admin_hash: Option<&[u8; 32]>,
) -> Result<Actor, IdentityError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(IdentityError::InvalidCredential);
    }
    let hash = hash_token(token);

    if let Some(admin) = admin_hash {
        if bool::from(admin.ct_eq(&hash)) {
            return Ok(Actor::admin());
        }
    }

    match db::find_token_actor(conn, &hash)? {
        Some((id, role)) => Ok(Actor { id, role }),
        None => Err(IdentityError::InvalidCredential),
    }
}
