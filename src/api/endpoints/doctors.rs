//! Doctor directory endpoints.
//!
//! Public: `GET /api/doctors`, `GET /api/doctors/:id/slots`.
//! Doctor-only: profile read/update and own availability toggle.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ok, parse_id, require_role, ApiContext, Envelope};
use crate::directory::{self, ProfileUpdate};
use crate::identity::Actor;
use crate::models::{BookedSlots, Doctor, DoctorListing, Role};

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<DoctorListing>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub doctor_id: Uuid,
    pub slots_booked: BookedSlots,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub profile_data: Doctor,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// `GET /api/doctors`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Envelope<DoctorsResponse>>, ApiError> {
    let doctors = ctx
        .with_db(|conn| directory::list_doctors(conn).map_err(ApiError::from))
        .await?;
    Ok(ok("Doctors", DoctorsResponse { doctors }))
}

/// `GET /api/doctors/:id/slots`
pub async fn slots(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<SlotsResponse>>, ApiError> {
    let doctor_id = parse_id(&id)?;
    let slots_booked = ctx
        .with_db(move |conn| directory::booked_slots(conn, &doctor_id).map_err(ApiError::from))
        .await?;
    Ok(ok(
        "Booked slots",
        SlotsResponse {
            doctor_id,
            slots_booked,
        },
    ))
}

/// `GET /api/doctor/profile`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<ProfileResponse>>, ApiError> {
    require_role(&actor, Role::Doctor)?;
    let profile_data = ctx
        .with_db(move |conn| directory::doctor_profile(conn, &actor.id).map_err(ApiError::from))
        .await?;
    Ok(ok("Doctor profile", ProfileResponse { profile_data }))
}

/// `POST /api/doctor/profile`
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Envelope<ProfileResponse>>, ApiError> {
    require_role(&actor, Role::Doctor)?;
    let Json(update) = payload?;
    let profile_data = ctx
        .with_db(move |conn| {
            directory::update_profile(conn, &actor.id, &update).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Profile updated", ProfileResponse { profile_data }))
}

/// `POST /api/doctor/availability`
pub async fn toggle_own_availability(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<AvailabilityResponse>>, ApiError> {
    require_role(&actor, Role::Doctor)?;
    let available = ctx
        .with_db(move |conn| {
            directory::change_availability(conn, &actor.id).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Availability changed", AvailabilityResponse { available }))
}
