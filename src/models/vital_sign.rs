use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::VitalKind;

/// A single patient-logged reading.
///
/// Column meaning depends on `kind`:
/// - blood_pressure: primary = systolic, secondary = diastolic, heart_rate = optional pulse
/// - glucose: primary = mg/dL, context = reading type
/// - pulse: primary = bpm, context = activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalReading {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: VitalKind,
    pub value_primary: f64,
    pub value_secondary: Option<f64>,
    pub heart_rate: Option<f64>,
    pub context: Option<String>,
    pub category: String,
    pub reading_date: NaiveDate,
    pub reading_time: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
