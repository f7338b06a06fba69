//! Process-wide application state shared by every request handler.
//!
//! Holds no open connection: each request opens its own through
//! `open_db()`, and SQLite's write lock serialises concurrent writers.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::LifecyclePolicy;
use crate::db;
use crate::identity::hash_token;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

/// Audit rows older than this are pruned on flush.
const AUDIT_RETENTION_DAYS: i64 = 90;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    /// Switches for the debatable lifecycle transitions.
    pub policy: LifecyclePolicy,
    /// SHA-256 of the configured admin token. `None` disables admin access.
    admin_token_hash: Option<[u8; 32]>,
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(db_path: impl Into<PathBuf>, policy: LifecyclePolicy) -> Self {
        Self {
            db_path: db_path.into(),
            policy,
            admin_token_hash: None,
            audit: AuditLogger::new(),
        }
    }

    /// Accept `token` as the admin credential.
    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.admin_token_hash = Some(hash_token(token));
        self
    }

    pub fn admin_token_hash(&self) -> Option<&[u8; 32]> {
        self.admin_token_hash.as_ref()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a fresh connection. Migrations are applied on open.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    // ── Audit ───────────────────────────────────────────────

    /// Record an access event; flushes to SQLite once the buffer is full.
    pub fn log_access(&self, actor: &str, action: &str, outcome: &str) {
        tracing::info!(actor, action, outcome, "api access");
        if self.audit.log(actor, action, outcome) {
            if let Err(e) = self.flush_audit() {
                tracing::warn!(error = %e, "Failed to flush audit log");
            }
        }
    }

    /// Write buffered audit entries and prune old ones.
    pub fn flush_audit(&self) -> Result<usize, CoreError> {
        let conn = self.open_db()?;
        let count = self.audit.flush_to_db(&conn)?;
        db::prune_audit_log(&conn, AUDIT_RETENTION_DAYS)?;
        Ok(count)
    }

    pub fn audit_buffer_len(&self) -> usize {
        self.audit.buffer_len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// AuditLogger: in-memory buffer, flushed in batches
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub actor: String,
    pub action: String,
    pub outcome: String,
}

pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Buffer an event. Returns `true` once the flush threshold is reached.
    pub fn log(&self, actor: &str, action: &str, outcome: &str) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(AuditEntry {
                timestamp: chrono::Utc::now(),
                actor: actor.to_string(),
                action: action.to_string(),
                outcome: outcome.to_string(),
            });
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    pub fn drain(&self) -> Result<Vec<AuditEntry>, CoreError> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .map_err(|_| CoreError::LockPoisoned)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn flush_to_db(&self, conn: &rusqlite::Connection) -> Result<usize, CoreError> {
        let entries = self.drain()?;
        if entries.is_empty() {
            return Ok(0);
        }

        let rows: Vec<db::AuditRow> = entries
            .into_iter()
            .map(|e| (e.timestamp.to_rfc3339(), e.actor, e.action, e.outcome))
            .collect();
        let count = rows.len();
        db::insert_audit_entries(conn, &rows)?;

        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_state() -> (tempfile::TempDir, CoreState) {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::new(dir.path().join("test.db"), LifecyclePolicy::default());
        (dir, state)
    }

    #[test]
    fn open_db_creates_schema() {
        let (_dir, state) = temp_state();
        let conn = state.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 8);
    }

    #[test]
    fn admin_token_is_stored_hashed() {
        let (_dir, state) = temp_state();
        assert!(state.admin_token_hash().is_none());
        let state = state.with_admin_token("letmein");
        assert_eq!(state.admin_token_hash(), Some(&hash_token("letmein")));
    }

    #[test]
    fn audit_buffer_flushes_to_db() {
        let (_dir, state) = temp_state();
        state.log_access("anonymous", "GET /api/health", "status:200");
        assert_eq!(state.audit_buffer_len(), 1);

        assert_eq!(state.flush_audit().unwrap(), 1);
        assert_eq!(state.audit_buffer_len(), 0);

        let conn = state.open_db().unwrap();
        let rows = db::recent_audit_entries(&conn, 5).unwrap();
        assert_eq!(rows[0].1, "GET /api/health");
    }

    #[test]
    fn buffer_signals_full_at_capacity() {
        let logger = AuditLogger::new();
        for _ in 0..AUDIT_BUFFER_CAPACITY - 1 {
            assert!(!logger.log("a", "b", "c"));
        }
        assert!(logger.log("a", "b", "c"));
    }
}
