use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            gender: self.gender.clone(),
            date_of_birth: self.date_of_birth,
        }
    }
}

/// Read-only copy of a patient captured at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}
