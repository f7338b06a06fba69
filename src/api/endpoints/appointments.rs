//! Appointment lifecycle endpoints.
//!
//! - `POST /api/appointments`: book (patient)
//! - `GET /api/appointments`: list, scoped by role
//! - `POST /api/appointments/:id/cancel`: cancel (owner, doctor, admin)
//! - `POST /api/appointments/:id/complete`: complete (doctor)
//! - `POST /api/appointments/:id/pay`: mark paid (patient)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ok, parse_id, require_role, ApiContext, Envelope};
use crate::appointment::{self, BookingRequest};
use crate::identity::Actor;
use crate::models::{Appointment, Role};

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

type Reply = Result<Json<Envelope<AppointmentResponse>>, ApiError>;

/// `POST /api/appointments`
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Reply {
    require_role(&actor, Role::Patient)?;
    let Json(req) = payload?;

    let appointment = ctx
        .with_db(move |conn| {
            appointment::book_appointment(conn, &actor, &req).map_err(ApiError::from)
        })
        .await?;

    Ok(ok("Appointment booked", AppointmentResponse { appointment }))
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<AppointmentsResponse>>, ApiError> {
    let appointments = ctx
        .with_db(move |conn| appointment::list_appointments(conn, &actor).map_err(ApiError::from))
        .await?;

    Ok(ok("Appointments", AppointmentsResponse { appointments }))
}

/// `POST /api/appointments/:id/cancel`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Reply {
    let id = parse_id(&id)?;
    let appointment = ctx
        .with_db(move |conn| {
            appointment::cancel_appointment(conn, &actor, &id).map_err(ApiError::from)
        })
        .await?;

    Ok(ok("Appointment cancelled", AppointmentResponse { appointment }))
}

/// `POST /api/appointments/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Reply {
    require_role(&actor, Role::Doctor)?;
    let id = parse_id(&id)?;
    let appointment = ctx
        .with_db(move |conn| {
            appointment::complete_appointment(conn, &actor, &id).map_err(ApiError::from)
        })
        .await?;

    Ok(ok("Appointment completed", AppointmentResponse { appointment }))
}

/// `POST /api/appointments/:id/pay`
pub async fn pay(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Reply {
    require_role(&actor, Role::Patient)?;
    let id = parse_id(&id)?;
    let policy = ctx.core.policy;
    let appointment = ctx
        .with_db(move |conn| {
            appointment::pay_appointment(conn, &actor, &id, policy).map_err(ApiError::from)
        })
        .await?;

    Ok(ok("Payment recorded", AppointmentResponse { appointment }))
}
