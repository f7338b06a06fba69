//! Admin endpoints: doctor onboarding and availability control.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::endpoints::doctors::AvailabilityResponse;
use crate::api::error::ApiError;
use crate::api::types::{ok, parse_id, require_role, ApiContext, Envelope};
use crate::directory::{self, NewDoctor};
use crate::identity::Actor;
use crate::models::{Doctor, Role};

#[derive(Serialize)]
pub struct AddDoctorResponse {
    pub doctor: Doctor,
    /// Shown once; only its hash is stored.
    pub token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub doctor_id: String,
}

/// `POST /api/admin/doctors`
pub async fn add_doctor(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<NewDoctor>, JsonRejection>,
) -> Result<Json<Envelope<AddDoctorResponse>>, ApiError> {
    require_role(&actor, Role::Admin)?;
    let Json(input) = payload?;
    let (doctor, token) = ctx
        .with_db(move |conn| directory::add_doctor(conn, input).map_err(ApiError::from))
        .await?;
    Ok(ok("Doctor added", AddDoctorResponse { doctor, token }))
}

/// `POST /api/admin/availability`
pub async fn change_availability(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Result<Json<Envelope<AvailabilityResponse>>, ApiError> {
    require_role(&actor, Role::Admin)?;
    let Json(req) = payload?;
    let doctor_id = parse_id(&req.doctor_id)?;
    let available = ctx
        .with_db(move |conn| {
            directory::change_availability(conn, &doctor_id).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Availability changed", AvailabilityResponse { available }))
}
