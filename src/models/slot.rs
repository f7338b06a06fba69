use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::SLOT_MINUTES;

/// Date label → time labels consumed on that date, for one doctor.
/// Times within a date are in clock order.
pub type BookedSlots = BTreeMap<NaiveDate, BTreeSet<SlotTime>>;

/// Canonical 12-hour time label of a bookable slot, e.g. `"09:30 AM"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTime(String);

const LABEL_FORMAT: &str = "%I:%M %p";

impl SlotTime {
    /// Parse a time label and normalise it. Accepts `9:30 am`, `09:30 AM`
    /// and 24-hour `14:00`; rejects times off the slot grid.
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim().to_uppercase();
        let time = NaiveTime::parse_from_str(&trimmed, LABEL_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&trimmed, "%H:%M"))
            .ok()?;
        if time.minute() % SLOT_MINUTES != 0 || time.second() != 0 {
            return None;
        }
        Some(Self(time.format(LABEL_FORMAT).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn clock(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.0, LABEL_FORMAT).ok()
    }

    /// Wrap a label already stored in canonical form.
    pub(crate) fn from_stored(label: String) -> Self {
        Self(label)
    }
}

impl Ord for SlotTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.clock()
            .cmp(&other.clock())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SlotTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SlotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a `YYYY-MM-DD` slot date label.
pub fn parse_slot_date(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), "%Y-%m-%d").ok()
}
