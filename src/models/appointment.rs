use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::doctor::DoctorSnapshot;
use super::enums::AppointmentStatus;
use super::patient::PatientSnapshot;
use super::slot::SlotTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub user_data: PatientSnapshot,
    pub doctor_data: DoctorSnapshot,
    pub slot_date: NaiveDate,
    pub slot_time: SlotTime,
    pub amount: f64,
    pub cancelled: bool,
    pub is_completed: bool,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Position in the `Scheduled → {Cancelled, Completed}` state machine.
    /// Payment is an orthogonal flag and does not appear here.
    pub fn status(&self) -> AppointmentStatus {
        if self.cancelled {
            AppointmentStatus::Cancelled
        } else if self.is_completed {
            AppointmentStatus::Completed
        } else {
            AppointmentStatus::Scheduled
        }
    }
}
