//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::identity::Actor;
use crate::models::Role;

/// Default per-client limits.
const DEFAULT_PER_MINUTE: u32 = 100;
const DEFAULT_PER_HOUR: u32 = 1000;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = MINUTE;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_limiter(core, RateLimiter::new())
    }

    pub fn with_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Run blocking database work on the blocking pool with a fresh connection.
    ///
    /// Lifecycle writes may wait on SQLite's write lock, so they must not
    /// run on an async worker thread.
    pub async fn with_db<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, ApiError> + Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = core.open_db()?;
            work(&mut conn)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}

// ═══════════════════════════════════════════════════════════
// Success envelope
// ═══════════════════════════════════════════════════════════

/// `{"success": true, "message": ..., ...payload}`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: message.into(),
        data,
    })
}

// ═══════════════════════════════════════════════════════════
// Boundary helpers
// ═══════════════════════════════════════════════════════════

/// Parse an id from a path or body. Malformed ids never reach the core.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid id: {raw}")))
}

/// Reject callers whose role does not match the route.
pub fn require_role(actor: &Actor, role: Role) -> Result<(), ApiError> {
    if actor.role != role {
        return Err(ApiError::Forbidden(format!("{role} access required")));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-minute and per-hour limits.
///
/// Keys whose windows have fully expired are swept once a minute, so the
/// map only holds clients seen within the last hour.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_PER_MINUTE, DEFAULT_PER_HOUR)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
            last_sweep: Instant::now(),
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Result<(), u64> {
        if now.duration_since(self.last_sweep) >= SWEEP_INTERVAL {
            self.windows.retain(|_, entries| {
                entries.retain(|ts| now.duration_since(*ts) < HOUR);
                !entries.is_empty()
            });
            self.last_sweep = now;
        }

        let entries = self.windows.entry(key.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < MINUTE)
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Number of clients currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
