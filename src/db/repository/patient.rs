use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Patient;

const PATIENT_COLUMNS: &str =
    "id, name, email, phone, address, gender, date_of_birth, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, email, phone, address, gender, date_of_birth, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.email,
            patient.phone,
            patient.address,
            patient.gender,
            patient.date_of_birth,
            format_timestamp(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id.to_string()],
        row_to_patient,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Overwrite the editable profile columns. Email and creation time are fixed.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET name = ?2, phone = ?3, address = ?4, gender = ?5, date_of_birth = ?6
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.name,
            patient.phone,
            patient.address,
            patient.gender,
            patient.date_of_birth,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

fn row_to_patient(row: &rusqlite::Row) -> Result<Patient, rusqlite::Error> {
    Ok(Patient {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        gender: row.get(5)?,
        date_of_birth: row.get(6)?,
        created_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_fetch() {
        let conn = open_memory_database().unwrap();
        let p = fixtures::patient(&conn, "Ada Obi");
        let fetched = get_patient(&conn, &p.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Ada Obi");
        assert_eq!(fetched.email, p.email);
        assert_eq!(
            format_timestamp(&fetched.created_at),
            format_timestamp(&p.created_at)
        );
    }

    #[test]
    fn missing_patient_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let conn = open_memory_database().unwrap();
        let p = fixtures::patient(&conn, "Bola");
        let twin = Patient {
            id: Uuid::new_v4(),
            ..p.clone()
        };
        let err = insert_patient(&conn, &twin).unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(count_patients(&conn).unwrap(), 1);
    }

    #[test]
    fn update_overwrites_profile_fields() {
        let conn = open_memory_database().unwrap();
        let mut p = fixtures::patient(&conn, "Chidi");
        p.name = "Chidi A.".into();
        p.phone = None;
        update_patient(&conn, &p).unwrap();
        let fetched = get_patient(&conn, &p.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Chidi A.");
        assert!(fetched.phone.is_none());

        p.id = Uuid::new_v4();
        assert!(matches!(
            update_patient(&conn, &p),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
