use serde::{Deserialize, Serialize};

/// One decoded course/speed report, as delivered to the pilot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFeedback {
    /// Course over ground, degrees in [0,360)
    pub heading: f64,
    /// Receiver flagged the sentence as valid ('A')
    pub validity: bool,
    /// Speed over ground, knots
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStatus {
    NoFix = 0,
    Fix = 1,
    DgpsFix = 2,
}

impl FixStatus {
    pub fn has_fix(self) -> bool {
        !matches!(self, FixStatus::NoFix)
    }
}

impl From<u8> for FixStatus {
    // GGA quality indicator; anything above DGPS (PPS, RTK, ...) still counts as a fix
    fn from(quality: u8) -> Self {
        match quality {
            0 => FixStatus::NoFix,
            2 => FixStatus::DgpsFix,
            _ => FixStatus::Fix,
        }
    }
}
