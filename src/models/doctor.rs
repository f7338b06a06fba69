use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Doctor directory record. The booked-slot map lives in `booked_slots`
/// and is only ever touched by the appointment lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: f64,
    pub address: String,
    pub image_url: Option<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// Fields worth keeping on an appointment after the profile changes.
    pub fn snapshot(&self) -> DoctorSnapshot {
        DoctorSnapshot {
            name: self.name.clone(),
            speciality: self.speciality.clone(),
            degree: self.degree.clone(),
            address: self.address.clone(),
            fees: self.fees,
            image_url: self.image_url.clone(),
        }
    }

    /// Public directory view (no contact email).
    pub fn listing(&self) -> DoctorListing {
        DoctorListing {
            id: self.id,
            name: self.name.clone(),
            speciality: self.speciality.clone(),
            degree: self.degree.clone(),
            experience: self.experience.clone(),
            about: self.about.clone(),
            fees: self.fees,
            address: self.address.clone(),
            image_url: self.image_url.clone(),
            available: self.available,
        }
    }
}

/// Read-only copy of a doctor captured at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSnapshot {
    pub name: String,
    pub speciality: String,
    pub degree: String,
    pub address: String,
    pub fees: f64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    pub id: Uuid,
    pub name: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: f64,
    pub address: String,
    pub image_url: Option<String>,
    pub available: bool,
}
