pub mod config;
pub mod nmea;
pub mod source;

pub use config::{check_gps, GpsConfig, SourceKind};
pub use nmea::{NmeaError, Sentence};
pub use source::{GnssSource, GpsEvent};
