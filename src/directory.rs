//! Doctor and patient directory: onboarding, profiles, availability.
//!
//! The booked-slot map is read here but only ever written by the
//! appointment lifecycle.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::identity;
use crate::models::{parse_slot_date, BookedSlots, Doctor, DoctorListing, Patient, Role};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for DirectoryError {
    fn from(err: rusqlite::Error) -> Self {
        DirectoryError::Database(err.into())
    }
}

// ═══════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: f64,
    pub address: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Patient-editable profile fields. Absent optional fields are cleared.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Doctor-editable profile fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub fees: f64,
    pub address: String,
    pub available: bool,
}

// ═══════════════════════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════════════════════

/// Onboard a doctor and issue their access token.
pub fn add_doctor(conn: &Connection, input: NewDoctor) -> Result<(Doctor, String), DirectoryError> {
    for (field, value) in [
        ("name", &input.name),
        ("speciality", &input.speciality),
        ("degree", &input.degree),
        ("experience", &input.experience),
        ("about", &input.about),
        ("address", &input.address),
    ] {
        require(field, value)?;
    }
    let email = normalize_email(&input.email)?;
    validate_fees(input.fees)?;

    let tx = conn.unchecked_transaction()?;
    let doctor = Doctor {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        email,
        speciality: input.speciality.trim().to_string(),
        degree: input.degree.trim().to_string(),
        experience: input.experience.trim().to_string(),
        about: input.about.trim().to_string(),
        fees: input.fees,
        address: input.address.trim().to_string(),
        image_url: input.image_url.filter(|u| !u.trim().is_empty()),
        available: true,
        created_at: Utc::now(),
    };
    db::insert_doctor(&tx, &doctor).map_err(|e| duplicate_email_or(e, &doctor.email))?;
    let token = identity::issue_token(&tx, &doctor.id, Role::Doctor)?;
    tx.commit()?;

    tracing::info!(doctor_id = %doctor.id, "Doctor added");
    Ok((doctor, token))
}

/// Public directory listing.
pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorListing>, DirectoryError> {
    Ok(db::list_doctors(conn)?.iter().map(Doctor::listing).collect())
}

pub fn doctor_profile(conn: &Connection, doctor_id: &Uuid) -> Result<Doctor, DirectoryError> {
    db::get_doctor(conn, doctor_id)?.ok_or(DirectoryError::NotFound {
        entity: "Doctor",
        id: *doctor_id,
    })
}

pub fn update_profile(
    conn: &Connection,
    doctor_id: &Uuid,
    update: &ProfileUpdate,
) -> Result<Doctor, DirectoryError> {
    validate_fees(update.fees)?;
    require("address", &update.address)?;
    match db::update_doctor_profile(
        conn,
        doctor_id,
        update.fees,
        update.address.trim(),
        update.available,
    ) {
        Ok(()) => {}
        Err(DatabaseError::NotFound { .. }) => {
            return Err(DirectoryError::NotFound {
                entity: "Doctor",
                id: *doctor_id,
            })
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(doctor_id = %doctor_id, "Doctor profile updated");
    doctor_profile(conn, doctor_id)
}

/// Flip a doctor's availability. Existing appointments are untouched.
pub fn change_availability(conn: &Connection, doctor_id: &Uuid) -> Result<bool, DirectoryError> {
    match db::toggle_doctor_availability(conn, doctor_id) {
        Ok(available) => {
            tracing::info!(doctor_id = %doctor_id, available, "Doctor availability changed");
            Ok(available)
        }
        Err(DatabaseError::NotFound { .. }) => Err(DirectoryError::NotFound {
            entity: "Doctor",
            id: *doctor_id,
        }),
        Err(e) => Err(e.into()),
    }
}

/// The doctor's booked-slot map.
pub fn booked_slots(conn: &Connection, doctor_id: &Uuid) -> Result<BookedSlots, DirectoryError> {
    doctor_profile(conn, doctor_id)?;
    Ok(db::booked_slots_for_doctor(conn, doctor_id)?)
}

// ═══════════════════════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════════════════════

/// Register a patient and issue their access token.
pub fn register_patient(conn: &Connection, input: NewPatient) -> Result<(Patient, String), DirectoryError> {
    require("name", &input.name)?;
    let email = normalize_email(&input.email)?;
    let date_of_birth = parse_date_of_birth(input.date_of_birth.as_deref())?;

    let tx = conn.unchecked_transaction()?;
    let patient = Patient {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        email,
        phone: non_blank(input.phone),
        address: non_blank(input.address),
        gender: non_blank(input.gender),
        date_of_birth,
        created_at: Utc::now(),
    };
    db::insert_patient(&tx, &patient).map_err(|e| duplicate_email_or(e, &patient.email))?;
    let token = identity::issue_token(&tx, &patient.id, Role::Patient)?;
    tx.commit()?;

    tracing::info!(patient_id = %patient.id, "Patient registered");
    Ok((patient, token))
}

pub fn patient_profile(conn: &Connection, patient_id: &Uuid) -> Result<Patient, DirectoryError> {
    db::get_patient(conn, patient_id)?.ok_or(DirectoryError::NotFound {
        entity: "Patient",
        id: *patient_id,
    })
}

/// Replace a patient's editable profile fields. Email is fixed at registration.
///
/// Appointments keep the snapshot taken when they were booked.
pub fn update_patient_profile(
    conn: &Connection,
    patient_id: &Uuid,
    update: PatientUpdate,
) -> Result<Patient, DirectoryError> {
    require("name", &update.name)?;
    let date_of_birth = parse_date_of_birth(update.date_of_birth.as_deref())?;
    let mut patient = patient_profile(conn, patient_id)?;
    patient.name = update.name.trim().to_string();
    patient.phone = non_blank(update.phone);
    patient.address = non_blank(update.address);
    patient.gender = non_blank(update.gender);
    patient.date_of_birth = date_of_birth;

    match db::update_patient(conn, &patient) {
        Ok(()) => {}
        Err(DatabaseError::NotFound { .. }) => {
            return Err(DirectoryError::NotFound {
                entity: "Patient",
                id: *patient_id,
            })
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(patient_id = %patient_id, "Patient profile updated");
    Ok(patient)
}

// ── helpers ──

fn duplicate_email_or(err: DatabaseError, email: &str) -> DirectoryError {
    if err.is_unique_violation() {
        DirectoryError::DuplicateEmail(email.to_string())
    } else {
        err.into()
    }
}

fn parse_date_of_birth(raw: Option<&str>) -> Result<Option<NaiveDate>, DirectoryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_slot_date(raw)
            .map(Some)
            .ok_or_else(|| DirectoryError::Validation(format!("Invalid date of birth: {raw}"))),
    }
}

fn require(field: &str, value: &str) -> Result<(), DirectoryError> {
    if value.trim().is_empty() {
        return Err(DirectoryError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_fees(fees: f64) -> Result<(), DirectoryError> {
    if !fees.is_finite() || fees <= 0.0 {
        return Err(DirectoryError::Validation("fees must be a positive number".into()));
    }
    Ok(())
}

fn normalize_email(raw: &str) -> Result<String, DirectoryError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DirectoryError::Validation(format!("Invalid email: {}", raw.trim())));
    }
    Ok(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
