use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Cancelled => "cancelled",
    Completed => "completed",
});

str_enum!(VitalKind {
    BloodPressure => "blood_pressure",
    Glucose => "glucose",
    Pulse => "pulse",
});

str_enum!(GlucoseReadingType {
    Fasting => "fasting",
    BeforeMeal => "before_meal",
    AfterMeal => "after_meal",
    Bedtime => "bedtime",
    Random => "random",
});

str_enum!(PulseActivity {
    Resting => "resting",
    LightExercise => "light_exercise",
    ModerateExercise => "moderate_exercise",
    IntenseExercise => "intense_exercise",
    AfterMeal => "after_meal",
    Stressed => "stressed",
    Relaxed => "relaxed",
    Morning => "morning",
    Evening => "evening",
    Other => "other",
});

str_enum!(BloodPressureCategory {
    Normal => "Normal",
    Elevated => "Elevated",
    Stage1High => "Stage 1 High",
    Stage2High => "Stage 2 High",
    Crisis => "Crisis",
});

str_enum!(GlucoseCategory {
    Low => "low",
    Normal => "normal",
    Prediabetic => "prediabetic",
    Diabetic => "diabetic",
});

str_enum!(PulseCategory {
    Bradycardia => "Bradycardia",
    Normal => "Normal",
    Elevated => "Elevated",
    Tachycardia => "Tachycardia",
});
