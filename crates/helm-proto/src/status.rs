use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot returned by the pilot's info query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PilotInfo {
    pub course: f64,
    pub set_point: f64,
    pub heading_offset: f64,
    pub speed: f64,
    pub enabled: bool,
}

/// A position in the track history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
    pub ts_unix_ms: i64,
}

/// Dashboard conditions driven by the pilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Led {
    NoGpsFix,
    InvalidGpsData,
    SpeedTooLow,
    HeadingErrorOutOfBounds,
    CorrectionAtLimit,
}

impl Led {
    pub const ALL: [Led; 5] = [
        Led::NoGpsFix,
        Led::InvalidGpsData,
        Led::SpeedTooLow,
        Led::HeadingErrorOutOfBounds,
        Led::CorrectionAtLimit,
    ];

    /// Name used on the dashboard and in the wiring config.
    pub fn name(self) -> &'static str {
        match self {
            Led::NoGpsFix => "NoGPSFix",
            Led::InvalidGpsData => "InvalidGPSData",
            Led::SpeedTooLow => "SpeedTooLow",
            Led::HeadingErrorOutOfBounds => "HeadingErrorOutOfBounds",
            Led::CorrectionAtLimit => "CorrectionAtLimit",
        }
    }

    pub fn from_name(name: &str) -> Option<Led> {
        Led::ALL.into_iter().find(|l| l.name() == name)
    }
}

impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
