//! Dashboard endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ok, require_role, ApiContext, Envelope};
use crate::dashboard::{self, AdminDashboard, DoctorDashboard};
use crate::identity::Actor;
use crate::models::Role;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse<T: Serialize> {
    pub dash_data: T,
}

/// `GET /api/doctor/dashboard`
pub async fn doctor(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<DashboardResponse<DoctorDashboard>>>, ApiError> {
    require_role(&actor, Role::Doctor)?;
    let dash_data = ctx
        .with_db(move |conn| dashboard::doctor_dashboard(conn, &actor.id).map_err(ApiError::from))
        .await?;
    Ok(ok("Doctor dashboard", DashboardResponse { dash_data }))
}

/// `GET /api/admin/dashboard`
pub async fn admin(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<DashboardResponse<AdminDashboard>>>, ApiError> {
    require_role(&actor, Role::Admin)?;
    let dash_data = ctx
        .with_db(|conn| dashboard::admin_dashboard(conn).map_err(ApiError::from))
        .await?;
    Ok(ok("Admin dashboard", DashboardResponse { dash_data }))
}
