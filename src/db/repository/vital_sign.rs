use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_enum, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{VitalKind, VitalReading};

const READING_COLUMNS: &str = "id, user_id, kind, value_primary, value_secondary, heart_rate, \
                               context, category, reading_date, reading_time, notes, created_at";

/// Optional narrowing for reading lists.
#[derive(Debug, Clone, Default)]
pub struct ReadingFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub context: Option<String>,
    pub limit: Option<usize>,
}

/// Insert a vital reading.
pub fn insert_vital_reading(conn: &Connection, r: &VitalReading) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO vital_readings (id, user_id, kind, value_primary, value_secondary, heart_rate,
                                     context, category, reading_date, reading_time, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            r.id.to_string(),
            r.user_id.to_string(),
            r.kind.as_str(),
            r.value_primary,
            r.value_secondary,
            r.heart_rate,
            r.context,
            r.category,
            r.reading_date,
            r.reading_time,
            r.notes,
            format_timestamp(&r.created_at),
        ],
    )?;
    Ok(())
}

/// Fetch a reading, scoped to its owner.
pub fn get_vital_reading(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<VitalReading>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {READING_COLUMNS} FROM vital_readings WHERE id = ?1 AND user_id = ?2"),
        params![id.to_string(), user_id.to_string()],
        row_to_reading,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// A user's readings of one kind, newest reading date first.
pub fn list_vital_readings(
    conn: &Connection,
    user_id: &Uuid,
    kind: VitalKind,
    filter: &ReadingFilter,
) -> Result<Vec<VitalReading>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {READING_COLUMNS} FROM vital_readings
         WHERE user_id = ?1 AND kind = ?2
           AND (?3 IS NULL OR reading_date >= ?3)
           AND (?4 IS NULL OR reading_date <= ?4)
           AND (?5 IS NULL OR context = ?5)
         ORDER BY reading_date DESC, reading_time DESC, created_at DESC
         LIMIT ?6"
    ))?;
    let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
    let rows = stmt.query_map(
        params![
            user_id.to_string(),
            kind.as_str(),
            filter.from,
            filter.to,
            filter.context,
            limit,
        ],
        row_to_reading,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Overwrite a reading's measured values. Errors with `NotFound` when the
/// reading does not exist for this user.
pub fn update_vital_reading(conn: &Connection, r: &VitalReading) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE vital_readings
         SET value_primary = ?3, value_secondary = ?4, heart_rate = ?5, context = ?6,
             category = ?7, reading_date = ?8, reading_time = ?9, notes = ?10
         WHERE id = ?1 AND user_id = ?2",
        params![
            r.id.to_string(),
            r.user_id.to_string(),
            r.value_primary,
            r.value_secondary,
            r.heart_rate,
            r.context,
            r.category,
            r.reading_date,
            r.reading_time,
            r.notes,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "VitalReading".into(),
            id: r.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_vital_reading(conn: &Connection, id: &Uuid, user_id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM vital_readings WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "VitalReading".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_reading(row: &rusqlite::Row) -> Result<VitalReading, rusqlite::Error> {
    Ok(VitalReading {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        user_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        kind: parse_enum(2, &row.get::<_, String>(2)?)?,
        value_primary: row.get(3)?,
        value_secondary: row.get(4)?,
        heart_rate: row.get(5)?,
        context: row.get(6)?,
        category: row.get(7)?,
        reading_date: row.get(8)?,
        reading_time: row.get(9)?,
        notes: row.get(10)?,
        created_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    fn reading(user_id: Uuid, kind: VitalKind, value: f64, date: &str, context: &str) -> VitalReading {
        VitalReading {
            id: Uuid::new_v4(),
            user_id,
            kind,
            value_primary: value,
            value_secondary: None,
            heart_rate: None,
            context: Some(context.into()),
            category: "normal".into(),
            reading_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            reading_time: Some("08:00".into()),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn list_filters_by_kind_range_and_context() {
        let conn = open_memory_database().unwrap();
        let p = fixtures::patient(&conn, "Vitals");
        for r in [
            reading(p.id, VitalKind::Glucose, 90.0, "2025-03-01", "fasting"),
            reading(p.id, VitalKind::Glucose, 150.0, "2025-03-05", "after_meal"),
            reading(p.id, VitalKind::Glucose, 95.0, "2025-03-10", "fasting"),
            reading(p.id, VitalKind::Pulse, 70.0, "2025-03-05", "resting"),
        ] {
            insert_vital_reading(&conn, &r).unwrap();
        }

        let all = list_vital_readings(&conn, &p.id, VitalKind::Glucose, &ReadingFilter::default())
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].value_primary, 95.0);

        let fasting = ReadingFilter {
            context: Some("fasting".into()),
            ..Default::default()
        };
        assert_eq!(
            list_vital_readings(&conn, &p.id, VitalKind::Glucose, &fasting).unwrap().len(),
            2
        );

        let window = ReadingFilter {
            from: NaiveDate::from_ymd_opt(2025, 3, 2),
            to: NaiveDate::from_ymd_opt(2025, 3, 9),
            ..Default::default()
        };
        let hits = list_vital_readings(&conn, &p.id, VitalKind::Glucose, &window).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value_primary, 150.0);

        let limited = ReadingFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(
            list_vital_readings(&conn, &p.id, VitalKind::Glucose, &limited).unwrap().len(),
            1
        );
    }

    #[test]
    fn update_and_delete_are_owner_scoped() {
        let conn = open_memory_database().unwrap();
        let owner = fixtures::patient(&conn, "Owner");
        let other = fixtures::patient(&conn, "Other");
        let mut r = reading(owner.id, VitalKind::Pulse, 72.0, "2025-03-01", "resting");
        insert_vital_reading(&conn, &r).unwrap();

        assert!(get_vital_reading(&conn, &r.id, &other.id).unwrap().is_none());
        assert!(matches!(
            delete_vital_reading(&conn, &r.id, &other.id),
            Err(DatabaseError::NotFound { .. })
        ));

        r.value_primary = 64.0;
        update_vital_reading(&conn, &r).unwrap();
        let fetched = get_vital_reading(&conn, &r.id, &owner.id).unwrap().unwrap();
        assert_eq!(fetched.value_primary, 64.0);

        delete_vital_reading(&conn, &r.id, &owner.id).unwrap();
        assert!(get_vital_reading(&conn, &r.id, &owner.id).unwrap().is_none());
    }
}
