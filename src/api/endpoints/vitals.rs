//! Vitals endpoints. Patients only; every call is scoped to the caller.
//!
//! - `POST /api/vitals/:kind`: record
//! - `GET /api/vitals/:kind`: list (`from`, `to`, `context`, `limit`)
//! - `GET /api/vitals/:kind/analytics?days=N`
//! - `GET /api/vitals/glucose/trends?days=N&readingType=T`
//! - `PUT /api/vitals/readings/:id`, `DELETE /api/vitals/readings/:id`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ok, parse_id, require_role, ApiContext, Envelope};
use crate::db::ReadingFilter;
use crate::identity::Actor;
use crate::models::{parse_slot_date, GlucoseReadingType, Role, VitalKind, VitalReading};
use crate::vitals::{
    self, GlucoseTrends, ReadingInput, VitalAnalytics, DEFAULT_ANALYTICS_DAYS, DEFAULT_TREND_DAYS,
};

#[derive(Serialize)]
pub struct ReadingResponse {
    pub reading: VitalReading,
}

#[derive(Serialize)]
pub struct ReadingsResponse {
    pub readings: Vec<VitalReading>,
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub analytics: VitalAnalytics,
}

#[derive(Serialize)]
pub struct DeletedResponse {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsQuery {
    pub days: Option<u32>,
    pub reading_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub context: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

fn parse_kind(raw: &str) -> Result<VitalKind, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown vital kind: {raw}")))
}

fn parse_date(field: &str, raw: Option<String>) -> Result<Option<chrono::NaiveDate>, ApiError> {
    raw.map(|r| {
        parse_slot_date(&r).ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: {r}")))
    })
    .transpose()
}

/// `POST /api/vitals/:kind`
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(kind): Path<String>,
    payload: Result<Json<ReadingInput>, JsonRejection>,
) -> Result<Json<Envelope<ReadingResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let kind = parse_kind(&kind)?;
    let Json(input) = payload?;
    let reading = ctx
        .with_db(move |conn| {
            vitals::record_reading(conn, &actor.id, kind, &input).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Reading saved", ReadingResponse { reading }))
}

/// `GET /api/vitals/:kind`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(kind): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<ReadingsResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let kind = parse_kind(&kind)?;
    let Query(q) = query?;
    let filter = ReadingFilter {
        from: parse_date("from", q.from)?,
        to: parse_date("to", q.to)?,
        context: q.context,
        limit: q.limit,
    };
    let readings = ctx
        .with_db(move |conn| {
            vitals::list_readings(conn, &actor.id, kind, &filter).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Readings", ReadingsResponse { readings }))
}

/// `GET /api/vitals/:kind/analytics`
pub async fn analytics(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(kind): Path<String>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<Envelope<AnalyticsResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let kind = parse_kind(&kind)?;
    let Query(q) = query?;
    let days = q.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    let today = Utc::now().date_naive();
    let analytics = ctx
        .with_db(move |conn| {
            vitals::analytics(conn, &actor.id, kind, days, today).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Analytics", AnalyticsResponse { analytics }))
}

/// `GET /api/vitals/:kind/trends`. Glucose only.
pub async fn trends(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(kind): Path<String>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> Result<Json<Envelope<GlucoseTrends>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    if parse_kind(&kind)? != VitalKind::Glucose {
        return Err(ApiError::NotFound(format!("No trends for {kind}")));
    }
    let Query(q) = query?;
    let reading_type = q
        .reading_type
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            t.parse::<GlucoseReadingType>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown reading type: {t}")))
        })
        .transpose()?;
    let days = q.days.unwrap_or(DEFAULT_TREND_DAYS);
    let today = Utc::now().date_naive();
    let trends = ctx
        .with_db(move |conn| {
            vitals::glucose_trends(conn, &actor.id, days, reading_type, today)
                .map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Glucose trends", trends))
}

/// `PUT /api/vitals/readings/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    payload: Result<Json<ReadingInput>, JsonRejection>,
) -> Result<Json<Envelope<ReadingResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let id = parse_id(&id)?;
    let Json(input) = payload?;
    let reading = ctx
        .with_db(move |conn| {
            vitals::update_reading(conn, &actor.id, &id, &input).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Reading updated", ReadingResponse { reading }))
}

/// `DELETE /api/vitals/readings/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DeletedResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let id = parse_id(&id)?;
    ctx.with_db(move |conn| vitals::delete_reading(conn, &actor.id, &id).map_err(ApiError::from))
        .await?;
    Ok(ok("Reading deleted", DeletedResponse {}))
}
