use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Doctor;

const DOCTOR_COLUMNS: &str = "id, name, email, speciality, degree, experience, about, fees, \
                              address, image_url, available, created_at";

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, name, email, speciality, degree, experience, about, fees,
                              address, image_url, available, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.email,
            doctor.speciality,
            doctor.degree,
            doctor.experience,
            doctor.about,
            doctor.fees,
            doctor.address,
            doctor.image_url,
            doctor.available,
            format_timestamp(&doctor.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
        params![id.to_string()],
        row_to_doctor,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// All doctors, oldest onboarding first.
pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map([], row_to_doctor)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    Ok(count)
}

/// Overwrite the doctor-editable profile fields.
pub fn update_doctor_profile(
    conn: &Connection,
    id: &Uuid,
    fees: f64,
    address: &str,
    available: bool,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE doctors SET fees = ?2, address = ?3, available = ?4 WHERE id = ?1",
        params![id.to_string(), fees, address, available],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "doctor".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Flip `available` in a single statement and return the new value.
pub fn toggle_doctor_availability(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    conn.query_row(
        "UPDATE doctors SET available = NOT available WHERE id = ?1 RETURNING available",
        params![id.to_string()],
        |row| row.get::<_, bool>(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "doctor".into(),
        id: id.to_string(),
    })
}

fn row_to_doctor(row: &rusqlite::Row) -> Result<Doctor, rusqlite::Error> {
    Ok(Doctor {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        speciality: row.get(3)?,
        degree: row.get(4)?,
        experience: row.get(5)?,
        about: row.get(6)?,
        fees: row.get(7)?,
        address: row.get(8)?,
        image_url: row.get(9)?,
        available: row.get(10)?,
        created_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_get_list() {
        let conn = open_memory_database().unwrap();
        let a = fixtures::doctor(&conn, "Dr A", 300.0);
        let b = fixtures::doctor(&conn, "Dr B", 450.0);

        let fetched = get_doctor(&conn, &b.id).unwrap().unwrap();
        assert_eq!(fetched.fees, 450.0);
        assert!(fetched.available);

        let all = list_doctors(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(count_doctors(&conn).unwrap(), 2);
    }

    #[test]
    fn toggle_flips_and_reports_new_value() {
        let conn = open_memory_database().unwrap();
        let d = fixtures::doctor(&conn, "Dr Toggle", 100.0);
        assert!(!toggle_doctor_availability(&conn, &d.id).unwrap());
        assert!(toggle_doctor_availability(&conn, &d.id).unwrap());
    }

    #[test]
    fn toggle_unknown_doctor_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = toggle_doctor_availability(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_profile_fields() {
        let conn = open_memory_database().unwrap();
        let d = fixtures::doctor(&conn, "Dr Update", 100.0);
        update_doctor_profile(&conn, &d.id, 250.0, "9 Side Rd", false).unwrap();
        let fetched = get_doctor(&conn, &d.id).unwrap().unwrap();
        assert_eq!(fetched.fees, 250.0);
        assert_eq!(fetched.address, "9 Side Rd");
        assert!(!fetched.available);
    }

    #[test]
    fn fees_must_be_positive() {
        let conn = open_memory_database().unwrap();
        let d = fixtures::doctor(&conn, "Dr Fee", 100.0);
        assert!(update_doctor_profile(&conn, &d.id, 0.0, "x", true).is_err());
    }
}
