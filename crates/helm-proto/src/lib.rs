pub mod gps;
pub mod status;

pub use gps::{FixStatus, GpsFeedback};
pub use status::{Led, PilotInfo, Point};
