//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ok, ApiContext, Envelope};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus a database round-trip.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<Envelope<HealthResponse>>, ApiError> {
    ctx.with_db(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| ApiError::Internal(e.to_string()))
    })
    .await?;

    Ok(ok(
        "ok",
        HealthResponse {
            status: "ok",
            version: crate::config::APP_VERSION,
        },
    ))
}
