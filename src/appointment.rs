//! Appointment lifecycle: book, cancel, complete, pay, list.
//!
//! Every mutation runs inside a `BEGIN IMMEDIATE` transaction, so the
//! appointment row and its `booked_slots` row change together. The slot
//! table's primary key `(doctor_id, slot_date, slot_time)` is the only
//! double-booking guard; there is no read-then-write check to race.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::LifecyclePolicy;
use crate::db::{self, DatabaseError};
use crate::identity::Actor;
use crate::models::{parse_slot_date, Appointment, AppointmentStatus, Role, SlotTime};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("Not allowed to {action} this appointment")]
    Unauthorized { action: &'static str },
    #[error("Slot {time} on {date} is already booked")]
    SlotConflict { date: String, time: String },
    #[error("{0}")]
    Validation(String),
    #[error("Cannot {action} an appointment that is {from}")]
    InvalidStateTransition {
        from: AppointmentStatus,
        action: &'static str,
    },
    #[error("Doctor is not available for booking")]
    DoctorUnavailable,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for AppointmentError {
    fn from(err: rusqlite::Error) -> Self {
        AppointmentError::Database(err.into())
    }
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Booking input as it arrives from a caller; labels are validated here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Book a slot for the calling patient.
pub fn book_appointment(
    conn: &mut Connection,
    caller: &Actor,
    req: &BookingRequest,
) -> Result<Appointment, AppointmentError> {
    if caller.role != Role::Patient {
        return Err(AppointmentError::Unauthorized { action: "book" });
    }
    if req.slot_date.trim().is_empty() || req.slot_time.trim().is_empty() {
        return Err(AppointmentError::Validation(
            "slotDate and slotTime are required".into(),
        ));
    }
    let slot_date = parse_slot_date(&req.slot_date).ok_or_else(|| {
        AppointmentError::Validation(format!("Invalid slot date: {}", req.slot_date))
    })?;
    let slot_time = SlotTime::parse(&req.slot_time).ok_or_else(|| {
        AppointmentError::Validation(format!("Invalid slot time: {}", req.slot_time))
    })?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let doctor = db::get_doctor(&tx, &req.doctor_id)?.ok_or(AppointmentError::NotFound {
        entity: "Doctor",
        id: req.doctor_id,
    })?;
    if !doctor.available {
        tracing::debug!(doctor_id = %doctor.id, "Booking rejected: doctor unavailable");
        return Err(AppointmentError::DoctorUnavailable);
    }
    let patient = db::get_patient(&tx, &caller.id)?.ok_or(AppointmentError::NotFound {
        entity: "Patient",
        id: caller.id,
    })?;

    let appt = Appointment {
        id: Uuid::new_v4(),
        user_id: patient.id,
        doctor_id: doctor.id,
        user_data: patient.snapshot(),
        doctor_data: doctor.snapshot(),
        slot_date,
        slot_time,
        amount: doctor.fees,
        cancelled: false,
        is_completed: false,
        payment: false,
        created_at: Utc::now(),
    };

    db::insert_appointment(&tx, &appt)?;
    match db::claim_slot(&tx, &doctor.id, appt.slot_date, &appt.slot_time, &appt.id) {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => {
            tracing::warn!(
                doctor_id = %doctor.id,
                slot_date = %appt.slot_date,
                slot_time = %appt.slot_time,
                "Booking rejected: slot already taken"
            );
            // Dropping `tx` rolls back the appointment insert.
            return Err(AppointmentError::SlotConflict {
                date: appt.slot_date.to_string(),
                time: appt.slot_time.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;

    tracing::info!(
        appointment_id = %appt.id,
        doctor_id = %appt.doctor_id,
        user_id = %appt.user_id,
        slot_date = %appt.slot_date,
        slot_time = %appt.slot_time,
        "Appointment booked"
    );
    Ok(appt)
}

/// Cancel an appointment and free its slot.
///
/// Patients may cancel their own, doctors their own, admins any.
/// Re-cancelling is a no-op; cancelling a completed appointment is refused.
pub fn cancel_appointment(
    conn: &mut Connection,
    caller: &Actor,
    appointment_id: &Uuid,
) -> Result<Appointment, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut appt = load(&tx, appointment_id)?;

    let permitted = match caller.role {
        Role::Patient => appt.user_id == caller.id,
        Role::Doctor => appt.doctor_id == caller.id,
        Role::Admin => true,
    };
    if !permitted {
        tracing::warn!(
            appointment_id = %appt.id,
            caller = %caller.audit_label(),
            "Cancellation rejected: not the owner"
        );
        return Err(AppointmentError::Unauthorized { action: "cancel" });
    }

    if appt.cancelled {
        return Ok(appt);
    }
    if appt.is_completed {
        return Err(AppointmentError::InvalidStateTransition {
            from: appt.status(),
            action: "cancel",
        });
    }

    if !db::mark_cancelled(&tx, &appt.id)? {
        let current = load(&tx, &appt.id)?;
        return Err(AppointmentError::InvalidStateTransition {
            from: current.status(),
            action: "cancel",
        });
    }
    let released = db::release_slot(&tx, &appt.doctor_id, appt.slot_date, &appt.slot_time, &appt.id)?;
    tx.commit()?;

    appt.cancelled = true;
    tracing::info!(
        appointment_id = %appt.id,
        doctor_id = %appt.doctor_id,
        by = %caller.role,
        slot_released = released,
        "Appointment cancelled"
    );
    Ok(appt)
}

/// Mark an appointment completed. Only its doctor may do this; the slot
/// stays consumed.
pub fn complete_appointment(
    conn: &mut Connection,
    caller: &Actor,
    appointment_id: &Uuid,
) -> Result<Appointment, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut appt = load(&tx, appointment_id)?;

    if caller.role != Role::Doctor || appt.doctor_id != caller.id {
        return Err(AppointmentError::Unauthorized { action: "complete" });
    }
    if appt.is_completed {
        return Ok(appt);
    }
    if appt.cancelled {
        return Err(AppointmentError::InvalidStateTransition {
            from: appt.status(),
            action: "complete",
        });
    }

    if !db::mark_completed(&tx, &appt.id)? {
        let current = load(&tx, &appt.id)?;
        return Err(AppointmentError::InvalidStateTransition {
            from: current.status(),
            action: "complete",
        });
    }
    tx.commit()?;

    appt.is_completed = true;
    tracing::info!(appointment_id = %appt.id, doctor_id = %appt.doctor_id, "Appointment completed");
    Ok(appt)
}

/// Mark an appointment paid. Only the booking patient may do this.
pub fn pay_appointment(
    conn: &mut Connection,
    caller: &Actor,
    appointment_id: &Uuid,
    policy: LifecyclePolicy,
) -> Result<Appointment, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut appt = load(&tx, appointment_id)?;

    if caller.role != Role::Patient || appt.user_id != caller.id {
        return Err(AppointmentError::Unauthorized { action: "pay for" });
    }
    if appt.cancelled && !policy.allow_payment_after_cancel {
        return Err(AppointmentError::InvalidStateTransition {
            from: appt.status(),
            action: "pay for",
        });
    }
    if appt.payment {
        return Ok(appt);
    }

    if !db::mark_paid(&tx, &appt.id, !policy.allow_payment_after_cancel)? {
        let current = load(&tx, &appt.id)?;
        return Err(AppointmentError::InvalidStateTransition {
            from: current.status(),
            action: "pay for",
        });
    }
    tx.commit()?;

    appt.payment = true;
    tracing::info!(appointment_id = %appt.id, user_id = %appt.user_id, "Appointment paid");
    Ok(appt)
}

/// Appointments visible to the caller, newest first.
pub fn list_appointments(conn: &Connection, caller: &Actor) -> Result<Vec<Appointment>, AppointmentError> {
    let list = match caller.role {
        Role::Patient => db::list_appointments_for_user(conn, &caller.id)?,
        Role::Doctor => db::list_appointments_for_doctor(conn, &caller.id)?,
        Role::Admin => db::list_all_appointments(conn)?,
    };
    Ok(list)
}

fn load(conn: &Connection, id: &Uuid) -> Result<Appointment, AppointmentError> {
    db::get_appointment(conn, id)?.ok_or(AppointmentError::NotFound {
        entity: "Appointment",
        id: *id,
    })
}
