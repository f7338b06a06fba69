//! API endpoint handlers, one module per resource.

pub mod admin;
pub mod appointments;
pub mod dashboard;
pub mod doctors;
pub mod health;
pub mod patients;
pub mod vitals;
