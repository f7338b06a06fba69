//! Repository layer: entity-scoped database operations.
//!
//! Functions take a borrowed `Connection` so callers decide the
//! transaction boundary (a `Transaction` derefs to `Connection`).

mod access_token;
mod appointment;
mod audit;
mod doctor;
mod patient;
mod slot;
mod vital_sign;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub use access_token::*;
pub use appointment::*;
pub use audit::*;
pub use doctor::*;
pub use patient::*;
pub use slot::*;
pub use vital_sign::*;

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr<Err = crate::db::DatabaseError>,
{
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width_and_round_trip() {
        let ts = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let s = format_timestamp(&ts);
        assert_eq!(s, "2025-03-01T10:00:00.000000Z");
        assert_eq!(parse_timestamp(0, &s).unwrap(), ts);
    }

    #[test]
    fn bad_uuid_is_conversion_failure() {
        let err = parse_uuid(3, "not-a-uuid").unwrap_err();
        assert!(matches!(
            err,
            rusqlite::Error::FromSqlConversionFailure(3, _, _)
        ));
    }
}
