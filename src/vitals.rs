//! Patient vitals store: blood pressure, glucose and pulse readings.
//!
//! Independent of the appointment lifecycle. Every read and write is
//! scoped to the owning patient; someone else's reading is `NotFound`.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, DatabaseError, ReadingFilter};
use crate::models::{
    parse_slot_date, BloodPressureCategory, GlucoseCategory, GlucoseReadingType, PulseActivity,
    PulseCategory, VitalKind, VitalReading,
};

/// Default analytics window.
pub const DEFAULT_ANALYTICS_DAYS: u32 = 30;
/// Default glucose trend window.
pub const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_ANALYTICS_DAYS: u32 = 365;
const MAX_NOTES_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    #[error("Reading not found")]
    NotFound { id: Uuid },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A reading as submitted. `value` is systolic, mg/dL or bpm by kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingInput {
    pub value: f64,
    /// Diastolic, blood pressure only.
    #[serde(default)]
    pub diastolic: Option<f64>,
    /// Pulse taken alongside a blood pressure reading.
    #[serde(default)]
    pub heart_rate: Option<f64>,
    /// Glucose reading type or pulse activity.
    #[serde(default)]
    pub context: Option<String>,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════════════════════

pub fn classify_blood_pressure(systolic: f64, diastolic: f64) -> BloodPressureCategory {
    if systolic >= 180.0 || diastolic >= 120.0 {
        BloodPressureCategory::Crisis
    } else if systolic >= 140.0 || diastolic >= 90.0 {
        BloodPressureCategory::Stage2High
    } else if systolic >= 130.0 || diastolic >= 80.0 {
        BloodPressureCategory::Stage1High
    } else if systolic >= 120.0 {
        BloodPressureCategory::Elevated
    } else {
        BloodPressureCategory::Normal
    }
}

/// Thresholds are (low below, normal up to, prediabetic up to).
pub fn classify_glucose(mg_dl: f64, reading_type: GlucoseReadingType) -> GlucoseCategory {
    let (low, normal, prediabetic) = match reading_type {
        GlucoseReadingType::Fasting | GlucoseReadingType::BeforeMeal => (70.0, 99.0, 125.0),
        GlucoseReadingType::AfterMeal | GlucoseReadingType::Random => (70.0, 139.0, 199.0),
        GlucoseReadingType::Bedtime => (70.0, 120.0, 160.0),
    };
    if mg_dl < low {
        GlucoseCategory::Low
    } else if mg_dl <= normal {
        GlucoseCategory::Normal
    } else if mg_dl <= prediabetic {
        GlucoseCategory::Prediabetic
    } else {
        GlucoseCategory::Diabetic
    }
}

pub fn classify_pulse(bpm: f64) -> PulseCategory {
    if bpm < 60.0 {
        PulseCategory::Bradycardia
    } else if bpm <= 100.0 {
        PulseCategory::Normal
    } else if bpm <= 120.0 {
        PulseCategory::Elevated
    } else {
        PulseCategory::Tachycardia
    }
}

// ═══════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════

/// Input checked and classified; ready to become a row.
struct Checked {
    value_primary: f64,
    value_secondary: Option<f64>,
    heart_rate: Option<f64>,
    context: Option<String>,
    category: String,
    reading_date: NaiveDate,
    reading_time: Option<String>,
    notes: Option<String>,
}

fn in_range(label: &str, value: f64, min: f64, max: f64, unit: &str) -> Result<(), VitalsError> {
    if !value.is_finite() || value < min || value > max {
        return Err(VitalsError::Validation(format!(
            "{label} must be between {min}-{max}{unit}"
        )));
    }
    Ok(())
}

fn check(kind: VitalKind, input: &ReadingInput) -> Result<Checked, VitalsError> {
    let reading_date = parse_slot_date(&input.date)
        .ok_or_else(|| VitalsError::Validation(format!("Invalid date: {}", input.date)))?;
    let reading_time = match input.time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(t) => {
            let parsed = NaiveTime::parse_from_str(t, "%H:%M")
                .map_err(|_| VitalsError::Validation(format!("Invalid time: {t}")))?;
            Some(parsed.format("%H:%M").to_string())
        }
    };
    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        return Err(VitalsError::Validation(format!(
            "Notes cannot exceed {MAX_NOTES_CHARS} characters"
        )));
    }
    let context = input
        .context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let (value_secondary, heart_rate, context, category) = match kind {
        VitalKind::BloodPressure => {
            let systolic = input.value;
            let diastolic = input
                .diastolic
                .ok_or_else(|| VitalsError::Validation("diastolic is required".into()))?;
            in_range("Systolic", systolic, 70.0, 250.0, " mmHg")?;
            in_range("Diastolic", diastolic, 40.0, 150.0, " mmHg")?;
            if systolic <= diastolic {
                return Err(VitalsError::Validation(
                    "Systolic must be higher than diastolic".into(),
                ));
            }
            if let Some(hr) = input.heart_rate {
                in_range("Pulse", hr, 40.0, 200.0, " bpm")?;
            }
            let category = classify_blood_pressure(systolic, diastolic);
            (Some(diastolic), input.heart_rate, None, category.as_str())
        }
        VitalKind::Glucose => {
            in_range("Glucose level", input.value, 20.0, 600.0, " mg/dL")?;
            let raw = context
                .ok_or_else(|| VitalsError::Validation("readingType is required".into()))?;
            let reading_type: GlucoseReadingType = raw
                .parse()
                .map_err(|_| VitalsError::Validation(format!("Unknown reading type: {raw}")))?;
            let category = classify_glucose(input.value, reading_type);
            (None, None, Some(reading_type.as_str()), category.as_str())
        }
        VitalKind::Pulse => {
            in_range("Pulse", input.value, 30.0, 220.0, " bpm")?;
            let activity = match context {
                None => None,
                Some(raw) => Some(
                    raw.parse::<PulseActivity>()
                        .map_err(|_| VitalsError::Validation(format!("Unknown activity: {raw}")))?
                        .as_str(),
                ),
            };
            (None, None, activity, classify_pulse(input.value).as_str())
        }
    };

    Ok(Checked {
        value_primary: input.value,
        value_secondary,
        heart_rate,
        context: context.map(str::to_string),
        category: category.to_string(),
        reading_date,
        reading_time,
        notes,
    })
}

// ═══════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════

pub fn record_reading(
    conn: &Connection,
    user_id: &Uuid,
    kind: VitalKind,
    input: &ReadingInput,
) -> Result<VitalReading, VitalsError> {
    let c = check(kind, input)?;
    let reading = VitalReading {
        id: Uuid::new_v4(),
        user_id: *user_id,
        kind,
        value_primary: c.value_primary,
        value_secondary: c.value_secondary,
        heart_rate: c.heart_rate,
        context: c.context,
        category: c.category,
        reading_date: c.reading_date,
        reading_time: c.reading_time,
        notes: c.notes,
        created_at: Utc::now(),
    };
    db::insert_vital_reading(conn, &reading)?;
    tracing::info!(reading_id = %reading.id, kind = %kind, category = %reading.category, "Vital reading recorded");
    Ok(reading)
}

pub fn list_readings(
    conn: &Connection,
    user_id: &Uuid,
    kind: VitalKind,
    filter: &ReadingFilter,
) -> Result<Vec<VitalReading>, VitalsError> {
    Ok(db::list_vital_readings(conn, user_id, kind, filter)?)
}

/// Replace a reading's values; the category is recomputed.
pub fn update_reading(
    conn: &Connection,
    user_id: &Uuid,
    reading_id: &Uuid,
    input: &ReadingInput,
) -> Result<VitalReading, VitalsError> {
    let existing = db::get_vital_reading(conn, reading_id, user_id)?
        .ok_or(VitalsError::NotFound { id: *reading_id })?;
    let c = check(existing.kind, input)?;
    let updated = VitalReading {
        value_primary: c.value_primary,
        value_secondary: c.value_secondary,
        heart_rate: c.heart_rate,
        context: c.context,
        category: c.category,
        reading_date: c.reading_date,
        reading_time: c.reading_time,
        notes: c.notes,
        ..existing
    };
    db::update_vital_reading(conn, &updated).map_err(|e| not_found_or(e, reading_id))?;
    tracing::info!(reading_id = %reading_id, "Vital reading updated");
    Ok(updated)
}

pub fn delete_reading(conn: &Connection, user_id: &Uuid, reading_id: &Uuid) -> Result<(), VitalsError> {
    db::delete_vital_reading(conn, reading_id, user_id).map_err(|e| not_found_or(e, reading_id))?;
    tracing::info!(reading_id = %reading_id, "Vital reading deleted");
    Ok(())
}

fn not_found_or(err: DatabaseError, id: &Uuid) -> VitalsError {
    match err {
        DatabaseError::NotFound { .. } => VitalsError::NotFound { id: *id },
        other => other.into(),
    }
}

// ═══════════════════════════════════════════════════════════
// Analytics
// ═══════════════════════════════════════════════════════════

/// Glucose time-in-range, in whole percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeInRange {
    pub low: u32,
    pub normal: u32,
    pub high: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalAnalytics {
    pub total_readings: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Mean diastolic (blood pressure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_diastolic: Option<f64>,
    /// Mean of readings that carried a pulse (blood pressure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_heart_rate: Option<f64>,
    pub category_distribution: BTreeMap<String, usize>,
    pub context_distribution: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_range: Option<TimeInRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hba1c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rate: Option<f64>,
    pub latest_reading: Option<VitalReading>,
}

/// Statistics over readings dated within the last `days` days of `today`.
pub fn analytics(
    conn: &Connection,
    user_id: &Uuid,
    kind: VitalKind,
    days: u32,
    today: NaiveDate,
) -> Result<VitalAnalytics, VitalsError> {
    if days == 0 || days > MAX_ANALYTICS_DAYS {
        return Err(VitalsError::Validation(format!(
            "days must be between 1 and {MAX_ANALYTICS_DAYS}"
        )));
    }
    let filter = ReadingFilter {
        from: Some(today - Duration::days(i64::from(days))),
        to: Some(today),
        ..Default::default()
    };
    let readings = db::list_vital_readings(conn, user_id, kind, &filter)?;
    Ok(summarize(kind, readings))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn percent(part: usize, total: usize) -> u32 {
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Fold readings (newest first) into analytics.
pub fn summarize(kind: VitalKind, readings: Vec<VitalReading>) -> VitalAnalytics {
    let values: Vec<f64> = readings.iter().map(|r| r.value_primary).collect();
    let total = readings.len();

    let mut category_distribution = BTreeMap::new();
    let mut context_distribution = BTreeMap::new();
    for r in &readings {
        *category_distribution.entry(r.category.clone()).or_insert(0) += 1;
        if kind != VitalKind::BloodPressure {
            let ctx = r.context.clone().unwrap_or_else(|| "unspecified".into());
            *context_distribution.entry(ctx).or_insert(0) += 1;
        }
    }

    let average = mean(&values).map(f64::round).unwrap_or(0.0);
    let min = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = values.iter().copied().reduce(f64::max).unwrap_or(0.0);

    let (mut average_diastolic, mut average_heart_rate) = (None, None);
    let (mut time_in_range, mut estimated_hba1c, mut resting_heart_rate) = (None, None, None);

    match kind {
        VitalKind::BloodPressure => {
            let diastolic: Vec<f64> = readings.iter().filter_map(|r| r.value_secondary).collect();
            let pulses: Vec<f64> = readings.iter().filter_map(|r| r.heart_rate).collect();
            average_diastolic = Some(mean(&diastolic).map(f64::round).unwrap_or(0.0));
            average_heart_rate = Some(mean(&pulses).map(f64::round).unwrap_or(0.0));
        }
        VitalKind::Glucose if total > 0 => {
            let count = |c: GlucoseCategory| {
                category_distribution.get(c.as_str()).copied().unwrap_or(0)
            };
            time_in_range = Some(TimeInRange {
                low: percent(count(GlucoseCategory::Low), total),
                normal: percent(count(GlucoseCategory::Normal), total),
                high: percent(
                    count(GlucoseCategory::Prediabetic) + count(GlucoseCategory::Diabetic),
                    total,
                ),
            });
            estimated_hba1c = Some((((average + 46.7) / 28.7) * 10.0).round() / 10.0);
        }
        VitalKind::Pulse if total > 0 => {
            let resting: Vec<f64> = readings
                .iter()
                .filter(|r| r.context.as_deref() == Some(PulseActivity::Resting.as_str()))
                .map(|r| r.value_primary)
                .collect();
            let basis = if resting.is_empty() {
                // Lowest quarter of all readings.
                let mut sorted = values.clone();
                sorted.sort_by(f64::total_cmp);
                sorted.truncate(total.div_ceil(4));
                sorted
            } else {
                resting
            };
            resting_heart_rate = mean(&basis).map(f64::round);
        }
        _ => {}
    }

    VitalAnalytics {
        total_readings: total,
        average,
        min,
        max,
        average_diastolic,
        average_heart_rate,
        category_distribution,
        context_distribution,
        time_in_range,
        estimated_hba1c,
        resting_heart_rate,
        latest_reading: readings.into_iter().next(),
    }
}

// ═══════════════════════════════════════════════════════════
// Glucose trends
// ═══════════════════════════════════════════════════════════

/// One point on a glucose chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub glucose: f64,
    pub reading_type: Option<String>,
    /// `HH:MM`; untimed readings chart at midnight.
    pub time: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseTrends {
    /// Date → points in time order. Dates ascend.
    pub trend_data: BTreeMap<NaiveDate, Vec<TrendPoint>>,
    pub total_readings: usize,
}

/// Glucose readings of the last `days` days grouped by date, oldest first,
/// optionally restricted to one reading type.
pub fn glucose_trends(
    conn: &Connection,
    user_id: &Uuid,
    days: u32,
    reading_type: Option<GlucoseReadingType>,
    today: NaiveDate,
) -> Result<GlucoseTrends, VitalsError> {
    if days == 0 || days > MAX_ANALYTICS_DAYS {
        return Err(VitalsError::Validation(format!(
            "days must be between 1 and {MAX_ANALYTICS_DAYS}"
        )));
    }
    let filter = ReadingFilter {
        from: Some(today - Duration::days(i64::from(days))),
        to: Some(today),
        context: reading_type.map(|t| t.as_str().to_string()),
        limit: None,
    };
    let mut readings = db::list_vital_readings(conn, user_id, VitalKind::Glucose, &filter)?;
    readings.sort_by(|a, b| {
        a.reading_date
            .cmp(&b.reading_date)
            .then_with(|| chart_time(a).cmp(chart_time(b)))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let total_readings = readings.len();
    let mut trend_data: BTreeMap<NaiveDate, Vec<TrendPoint>> = BTreeMap::new();
    for r in readings {
        let time = chart_time(&r).to_string();
        trend_data.entry(r.reading_date).or_default().push(TrendPoint {
            glucose: r.value_primary,
            reading_type: r.context,
            time,
            category: r.category,
        });
    }
    Ok(GlucoseTrends {
        trend_data,
        total_readings,
    })
}

fn chart_time(reading: &VitalReading) -> &str {
    reading.reading_time.as_deref().unwrap_or("00:00")
}
