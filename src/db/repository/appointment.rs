use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, SlotTime};

const APPOINTMENT_COLUMNS: &str = "id, user_id, doctor_id, user_data, doctor_data, slot_date, \
                                   slot_time, amount, cancelled, is_completed, payment, created_at";

// rowid breaks ties between appointments created within the same microsecond.
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, user_id, doctor_id, user_data, doctor_data, slot_date,
                                   slot_time, amount, cancelled, is_completed, payment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.user_id.to_string(),
            appt.doctor_id.to_string(),
            serde_json::to_string(&appt.user_data)?,
            serde_json::to_string(&appt.doctor_data)?,
            appt.slot_date,
            appt.slot_time.as_str(),
            appt.amount,
            appt.cancelled,
            appt.is_completed,
            appt.payment,
            format_timestamp(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id.to_string()],
        row_to_appointment,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_appointments_for_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE user_id = ?1 {NEWEST_FIRST}"),
        params![user_id.to_string()],
    )
}

pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE doctor_id = ?1 {NEWEST_FIRST}"
        ),
        params![doctor_id.to_string()],
    )
}

pub fn list_all_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments {NEWEST_FIRST}"),
        [],
    )
}

/// Most recently created appointments system-wide.
pub fn latest_appointments(conn: &Connection, limit: usize) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments {NEWEST_FIRST} LIMIT ?1"),
        params![limit as i64],
    )
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

/// Set `cancelled` unless the appointment is completed. Returns whether the
/// row matched; `false` means it is missing or already completed.
pub fn mark_cancelled(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET cancelled = 1 WHERE id = ?1 AND is_completed = 0",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Set `is_completed` unless the appointment is cancelled.
pub fn mark_completed(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET is_completed = 1 WHERE id = ?1 AND cancelled = 0",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Set `payment`. With `require_active`, cancelled appointments are left untouched.
pub fn mark_paid(conn: &Connection, id: &Uuid, require_active: bool) -> Result<bool, DatabaseError> {
    let sql = if require_active {
        "UPDATE appointments SET payment = 1 WHERE id = ?1 AND cancelled = 0"
    } else {
        "UPDATE appointments SET payment = 1 WHERE id = ?1"
    };
    let affected = conn.execute(sql, params![id.to_string()])?;
    Ok(affected > 0)
}

fn query_appointments<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_appointment)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_appointment(row: &rusqlite::Row) -> Result<Appointment, rusqlite::Error> {
    Ok(Appointment {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        user_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        doctor_id: parse_uuid(2, &row.get::<_, String>(2)?)?,
        user_data: json_column(3, &row.get::<_, String>(3)?)?,
        doctor_data: json_column(4, &row.get::<_, String>(4)?)?,
        slot_date: row.get(5)?,
        slot_time: SlotTime::from_stored(row.get(6)?),
        amount: row.get(7)?,
        cancelled: row.get(8)?,
        is_completed: row.get(9)?,
        payment: row.get(10)?,
        created_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
    })
}
