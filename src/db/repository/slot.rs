use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{BookedSlots, SlotTime};

/// Record a slot as consumed by `appointment_id`.
///
/// Fails with a PRIMARY KEY violation when the doctor already has that
/// date/time; callers map that to a slot conflict.
pub fn claim_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &SlotTime,
    appointment_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO booked_slots (doctor_id, slot_date, slot_time, appointment_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            doctor_id.to_string(),
            date,
            time.as_str(),
            appointment_id.to_string(),
        ],
    )?;
    Ok(())
}

/// Free a slot, but only if it is still held by `appointment_id`.
/// Returns whether a row was removed.
pub fn release_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &SlotTime,
    appointment_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM booked_slots
         WHERE doctor_id = ?1 AND slot_date = ?2 AND slot_time = ?3 AND appointment_id = ?4",
        params![
            doctor_id.to_string(),
            date,
            time.as_str(),
            appointment_id.to_string(),
        ],
    )?;
    Ok(affected > 0)
}

pub fn is_slot_taken(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &SlotTime,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM booked_slots WHERE doctor_id = ?1 AND slot_date = ?2 AND slot_time = ?3",
        params![doctor_id.to_string(), date, time.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// The doctor's booked-slot map: date → set of consumed time labels.
pub fn booked_slots_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<BookedSlots, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT slot_date, slot_time FROM booked_slots WHERE doctor_id = ?1",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut slots = BookedSlots::new();
    for row in rows {
        let (date, time) = row?;
        slots
            .entry(date)
            .or_default()
            .insert(SlotTime::from_stored(time));
    }
    Ok(slots)
}
