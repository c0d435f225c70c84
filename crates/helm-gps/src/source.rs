//! NMEA line sources. Each decoded line becomes at most one [`GpsEvent`];
//! sentences we do not decode are skipped.

use anyhow::{bail, Context, Result};
use helm_proto::{FixStatus, GpsFeedback};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::config::{GpsConfig, SourceKind};
use crate::nmea::{self, Sentence};

#[derive(Debug, Clone, PartialEq)]
pub enum GpsEvent {
    Feedback(GpsFeedback),
    Fix(FixStatus),
    /// A line that could not be decoded.
    Error(String),
}

enum Reader {
    Serial(BufReader<SerialStream>),
    File { reader: BufReader<File>, path: PathBuf, interval: Duration },
}

pub struct GnssSource {
    reader: Reader,
    last_fix: Option<FixStatus>,
    buf: Vec<u8>,
}

impl GnssSource {
    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(dev, baud)
            .open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        Ok(Self::new(Reader::Serial(BufReader::new(port))))
    }

    /// Replays a recorded log, one `RMC` every `interval`, rewinding at EOF.
    pub fn file(path: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = std::fs::File::open(&path).with_context(|| format!("open nmea file {}", path.display()))?;
        let reader = BufReader::new(File::from_std(f));
        Ok(Self::new(Reader::File { reader, path, interval }))
    }

    pub fn from_config(cfg: &GpsConfig) -> Result<Self> {
        match cfg.source {
            SourceKind::NmeaSerial => Self::serial(&cfg.device, cfg.baud),
            SourceKind::NmeaFile => {
                let file = cfg.file.as_ref().context("gps.file is required for nmea-file")?;
                Self::file(file, cfg.replay_interval())
            }
        }
    }

    fn new(reader: Reader) -> Self {
        Self { reader, last_fix: None, buf: Vec::new() }
    }

    pub async fn next_event(&mut self) -> Result<GpsEvent> {
        loop {
            self.buf.clear();
            match &mut self.reader {
                Reader::Serial(r) => {
                    let n = r.read_until(b'\n', &mut self.buf).await.context("read serial")?;
                    if n == 0 {
                        bail!("serial port closed");
                    }
                }
                Reader::File { reader, path, .. } => {
                    let n = reader.read_until(b'\n', &mut self.buf).await.context("read nmea file")?;
                    if n == 0 {
                        debug!(path = %path.display(), "end of replay, rewinding");
                        reader.seek(SeekFrom::Start(0)).await.context("rewind nmea file")?;
                        let n = reader.read_until(b'\n', &mut self.buf).await.context("read nmea file")?;
                        if n == 0 {
                            bail!("nmea file {} is empty", path.display());
                        }
                    }
                }
            }

            // serial noise: report it and keep reading
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => return Ok(GpsEvent::Error(format!("gps line is not UTF-8: {}", e))),
            };
            if line.is_empty() {
                continue;
            }
            match nmea::parse(line) {
                Ok(Sentence::Rmc(fb)) => {
                    if let Reader::File { interval, .. } = &self.reader {
                        if !interval.is_zero() {
                            tokio::time::sleep(*interval).await;
                        }
                    }
                    return Ok(GpsEvent::Feedback(fb));
                }
                Ok(Sentence::Gga(fix)) => {
                    if self.last_fix != Some(fix) {
                        info!(?fix, "gps fix quality changed");
                        self.last_fix = Some(fix);
                    }
                    return Ok(GpsEvent::Fix(fix));
                }
                Ok(Sentence::Other(address)) => debug!(%address, "ignoring sentence"),
                Err(e) => return Ok(GpsEvent::Error(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOG: &str = "\
$GPGGA,101500,4823.4000,N,00428.8000,W,2,09,0.8,12.0,M,50.1,M,,*6F\r
$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74\r
\r
$GPRMC,101504,A,4823.4000,N,00428.8000,W,6.0,210.5,181026,,*0D\r
$GPRMC,101503,A,4823.4000,N,00428.8000,W,abc,90.0,181026,,*7D\r
";

    fn replay_file(name: &str, content: &str) -> PathBuf {
        replay_file_bytes(name, content.as_bytes())
    }

    fn replay_file_bytes(name: &str, content: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("helm-gps-{}-{}.nmea", name, std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[tokio::test]
    async fn replays_and_loops() {
        let path = replay_file("loop", LOG);
        let mut src = GnssSource::file(&path, Duration::ZERO).unwrap();

        for _ in 0..2 {
            assert_eq!(src.next_event().await.unwrap(), GpsEvent::Fix(FixStatus::DgpsFix));
            let GpsEvent::Feedback(fb) = src.next_event().await.unwrap() else { panic!("expected feedback") };
            assert_eq!(fb.heading, 210.5);
            assert_eq!(fb.speed, 6.0);
            let GpsEvent::Error(msg) = src.next_event().await.unwrap() else { panic!("expected error") };
            assert!(msg.contains("speed"), "{msg}");
        }
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn line_noise_becomes_an_error_event() {
        let mut content = b"$GP\xffRMC,101504,A,4823.4000,N,00428.8000,W,6.0,210.5,181026,,*0D\r\n".to_vec();
        content.extend_from_slice(b"$GPRMC,101505,A,4823.4000,N,00428.8000,W,6.0,211.0,181026,,*08\r\n");
        let path = replay_file_bytes("noise", &content);
        let mut src = GnssSource::file(&path, Duration::ZERO).unwrap();

        let GpsEvent::Error(msg) = src.next_event().await.unwrap() else { panic!("expected error") };
        assert!(msg.contains("UTF-8"), "{msg}");
        let GpsEvent::Feedback(fb) = src.next_event().await.unwrap() else { panic!("expected feedback") };
        assert_eq!(fb.heading, 211.0);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn empty_file_is_an_error() {
        let path = replay_file("empty", "");
        let mut src = GnssSource::file(&path, Duration::ZERO).unwrap();
        assert!(src.next_event().await.is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = GnssSource::file("/definitely/not/here.nmea", Duration::ZERO).err().unwrap();
        assert!(format!("{err:#}").contains("open nmea file"));
    }
}
