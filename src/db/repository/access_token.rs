use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_enum, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Role;

/// Store the hash of an issued bearer token.
pub fn insert_access_token(
    conn: &Connection,
    token_hash: &[u8; 32],
    actor_id: &Uuid,
    role: Role,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO access_tokens (token_hash, actor_id, role, issued_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            &token_hash[..],
            actor_id.to_string(),
            role.as_str(),
            format_timestamp(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// Resolve a token hash to the actor it was issued for.
pub fn find_token_actor(
    conn: &Connection,
    token_hash: &[u8; 32],
) -> Result<Option<(Uuid, Role)>, DatabaseError> {
    conn.query_row(
        "SELECT actor_id, role FROM access_tokens WHERE token_hash = ?1",
        params![&token_hash[..]],
        |row| {
            Ok((
                parse_uuid(0, &row.get::<_, String>(0)?)?,
                parse_enum::<Role>(1, &row.get::<_, String>(1)?)?,
            ))
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Drop every token issued to an actor. Returns how many were removed.
pub fn revoke_actor_tokens(conn: &Connection, actor_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM access_tokens WHERE actor_id = ?1",
        params![actor_id.to_string()],
    )?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn issue_find_revoke() {
        let conn = open_memory_database().unwrap();
        let actor = Uuid::new_v4();
        let hash = [7u8; 32];
        insert_access_token(&conn, &hash, &actor, Role::Doctor).unwrap();

        assert_eq!(find_token_actor(&conn, &hash).unwrap(), Some((actor, Role::Doctor)));
        assert_eq!(find_token_actor(&conn, &[8u8; 32]).unwrap(), None);

        assert_eq!(revoke_actor_tokens(&conn, &actor).unwrap(), 1);
        assert_eq!(find_token_actor(&conn, &hash).unwrap(), None);
    }
}
