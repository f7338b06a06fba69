//! Patient endpoints: self-registration and own profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ok, require_role, ApiContext, Envelope};
use crate::directory::{self, NewPatient, PatientUpdate};
use crate::identity::Actor;
use crate::models::{Patient, Role};

#[derive(Serialize)]
pub struct RegisterResponse {
    pub patient: Patient,
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfileResponse {
    pub user_data: Patient,
}

/// `POST /api/patients/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<Json<Envelope<RegisterResponse>>, ApiError> {
    let Json(input) = payload?;
    let (patient, token) = ctx
        .with_db(move |conn| directory::register_patient(conn, input).map_err(ApiError::from))
        .await?;
    Ok(ok("Registered", RegisterResponse { patient, token }))
}

/// `GET /api/patient/profile`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<PatientProfileResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let user_data = ctx
        .with_db(move |conn| directory::patient_profile(conn, &actor.id).map_err(ApiError::from))
        .await?;
    Ok(ok("Patient profile", PatientProfileResponse { user_data }))
}

/// `POST /api/patient/profile`
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<Json<Envelope<PatientProfileResponse>>, ApiError> {
    require_role(&actor, Role::Patient)?;
    let Json(update) = payload?;
    let user_data = ctx
        .with_db(move |conn| {
            directory::update_patient_profile(conn, &actor.id, update).map_err(ApiError::from)
        })
        .await?;
    Ok(ok("Profile updated", PatientProfileResponse { user_data }))
}
