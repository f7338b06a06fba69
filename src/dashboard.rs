//! Read-only dashboard projections for doctors and admins.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::appointment::AppointmentError;
use crate::config::LATEST_APPOINTMENTS_LIMIT;
use crate::db;
use crate::models::Appointment;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboard {
    /// Sum of `amount` over appointments that are both completed and paid.
    pub earnings: f64,
    /// Distinct patients, cancelled bookings included.
    pub patients: usize,
    pub appointments: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub doctors: i64,
    pub appointments: i64,
    pub patients: i64,
    pub latest_appointments: Vec<Appointment>,
}

/// Aggregate one doctor's appointments.
pub fn doctor_dashboard(conn: &Connection, doctor_id: &Uuid) -> Result<DoctorDashboard, AppointmentError> {
    if db::get_doctor(conn, doctor_id)?.is_none() {
        return Err(AppointmentError::NotFound {
            entity: "Doctor",
            id: *doctor_id,
        });
    }
    let appointments = db::list_appointments_for_doctor(conn, doctor_id)?;
    Ok(summarize(appointments))
}

/// System-wide totals plus the most recent bookings.
pub fn admin_dashboard(conn: &Connection) -> Result<AdminDashboard, AppointmentError> {
    Ok(AdminDashboard {
        doctors: db::count_doctors(conn)?,
        appointments: db::count_appointments(conn)?,
        patients: db::count_patients(conn)?,
        latest_appointments: db::latest_appointments(conn, LATEST_APPOINTMENTS_LIMIT)?,
    })
}

/// Fold a doctor's appointment list into dashboard figures.
///
/// Recency is decided by `created_at`, not by input order.
pub fn summarize(mut appointments: Vec<Appointment>) -> DoctorDashboard {
    let earnings = appointments
        .iter()
        .filter(|a| a.is_completed && a.payment)
        .map(|a| a.amount)
        .sum();
    let patients = appointments
        .iter()
        .map(|a| a.user_id)
        .collect::<HashSet<_>>()
        .len();
    let total = appointments.len();

    appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    appointments.truncate(LATEST_APPOINTMENTS_LIMIT);

    DoctorDashboard {
        earnings,
        patients,
        appointments: total,
        latest_appointments: appointments,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::*;
    use crate::appointment::{book_appointment, cancel_appointment, BookingRequest};
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;
    use crate::identity::Actor;
    use crate::models::{DoctorSnapshot, PatientSnapshot, Role, SlotTime};

    fn appt(user_id: Uuid, amount: f64, completed: bool, paid: bool, age_min: i64) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id,
            doctor_id: Uuid::nil(),
            user_data: PatientSnapshot {
                name: "P".into(),
                email: "p@example.com".into(),
                phone: None,
                gender: None,
                date_of_birth: None,
            },
            doctor_data: DoctorSnapshot {
                name: "D".into(),
                speciality: "GP".into(),
                degree: "MBBS".into(),
                address: "x".into(),
                fees: amount,
                image_url: None,
            },
            slot_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            slot_time: SlotTime::parse("10:00 AM").unwrap(),
            amount,
            cancelled: false,
            is_completed: completed,
            payment: paid,
            created_at: Utc::now() - Duration::minutes(age_min),
        }
    }

    #[test]
    fn earnings_count_only_completed_and_paid() {
        let u = Uuid::new_v4();
        let dash = summarize(vec![
            appt(u, 100.0, true, true, 3),
            appt(u, 200.0, true, false, 2),
            appt(u, 50.0, false, true, 1),
        ]);
        assert_eq!(dash.earnings, 100.0);
        assert_eq!(dash.appointments, 3);
        assert_eq!(dash.patients, 1);
    }

    #[test]
    fn latest_is_five_newest_by_creation_time() {
        let u = Uuid::new_v4();
        // Oldest first on input, to prove the order comes from timestamps.
        let list: Vec<Appointment> = (0..7).rev().map(|age| appt(u, 10.0, false, false, age)).collect();
        let newest = list[6].id;
        let dash = summarize(list);
        assert_eq!(dash.latest_appointments.len(), 5);
        assert_eq!(dash.latest_appointments[0].id, newest);
        assert!(dash
            .latest_appointments
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn doctor_dashboard_counts_cancelled_patients() {
        let mut conn = open_memory_database().unwrap();
        let d = fixtures::doctor(&conn, "Dr Dash", 100.0);
        let p1 = Actor {
            id: fixtures::patient(&conn, "Dash1").id,
            role: Role::Patient,
        };
        let p2 = Actor {
            id: fixtures::patient(&conn, "Dash2").id,
            role: Role::Patient,
        };
        let req = |time: &str| BookingRequest {
            doctor_id: d.id,
            slot_date: "2025-03-01".into(),
            slot_time: time.into(),
        };
        book_appointment(&mut conn, &p1, &req("10:00 AM")).unwrap();
        let b = book_appointment(&mut conn, &p2, &req("10:30 AM")).unwrap();
        cancel_appointment(&mut conn, &p2, &b.id).unwrap();

        let dash = doctor_dashboard(&conn, &d.id).unwrap();
        assert_eq!(dash.appointments, 2);
        assert_eq!(dash.patients, 2);
        assert_eq!(dash.earnings, 0.0);

        assert!(matches!(
            doctor_dashboard(&conn, &Uuid::new_v4()),
            Err(AppointmentError::NotFound { .. })
        ));
    }

    #[test]
    fn admin_dashboard_totals() {
        let mut conn = open_memory_database().unwrap();
        let d = fixtures::doctor(&conn, "Dr Admin", 100.0);
        fixtures::doctor(&conn, "Dr Spare", 100.0);
        let p = Actor {
            id: fixtures::patient(&conn, "AdminView").id,
            role: Role::Patient,
        };
        book_appointment(
            &mut conn,
            &p,
            &BookingRequest {
                doctor_id: d.id,
                slot_date: "2025-03-01".into(),
                slot_time: "10:00 AM".into(),
            },
        )
        .unwrap();

        let dash = admin_dashboard(&conn).unwrap();
        assert_eq!(dash.doctors, 2);
        assert_eq!(dash.patients, 1);
        assert_eq!(dash.appointments, 1);
        assert_eq!(dash.latest_appointments.len(), 1);
    }
}
