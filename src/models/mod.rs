pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod patient;
pub mod slot;
pub mod vital_sign;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use patient::*;
pub use slot::*;
pub use vital_sign::*;
