use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    NmeaSerial,
    NmeaFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub source: SourceKind,
    pub device: String,
    pub baud: u32,
    /// Recorded NMEA log, replayed in a loop (`nmea-file` only)
    pub file: Option<PathBuf>,
    pub replay_interval_ms: u64,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::NmeaSerial,
            device: "/dev/ttyMFD1".to_string(),
            baud: 9600,
            file: None,
            replay_interval_ms: 1000,
        }
    }
}

impl GpsConfig {
    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }
}

pub fn check_gps(cfg: &GpsConfig) -> Result<()> {
    match cfg.source {
        SourceKind::NmeaSerial => {
            anyhow::ensure!(!cfg.device.is_empty(), "gps.device must be set for nmea-serial");
            anyhow::ensure!(cfg.baud > 0, "gps.baud must be > 0");
        }
        SourceKind::NmeaFile => {
            let file = cfg
                .file
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("gps.file must be set for nmea-file"))?;
            anyhow::ensure!(file.is_file(), "gps.file {} is not a readable file", file.display());
        }
    }
    Ok(())
}
