use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// One buffered audit row: (timestamp, actor, action, outcome).
pub type AuditRow = (String, String, String, String);

/// Insert a batch of audit rows in a single transaction.
pub fn insert_audit_entries(conn: &Connection, rows: &[AuditRow]) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO audit_log (timestamp, actor, action, outcome) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (timestamp, actor, action, outcome) in rows {
            stmt.execute(params![timestamp, actor, action, outcome])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE julianday(timestamp) < julianday('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Most recent entries, newest first, as (actor, action, outcome).
#[cfg(test)]
pub fn recent_audit_entries(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<(String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT actor, action, outcome FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
