//! Minimal NMEA 0183 decoding: `RMC` for course and speed, `GGA` for the
//! fix quality. Every other sentence type is recognised but not decoded.

use helm_proto::{FixStatus, GpsFeedback};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NmeaError {
    #[error("not an NMEA sentence: {0:?}")]
    NotASentence(String),
    #[error("missing checksum in {0:?}")]
    MissingChecksum(String),
    #[error("bad checksum field {0:?}")]
    BadChecksumField(String),
    #[error("checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("{sentence}: expected at least {expected} fields, got {got}")]
    TooShort { sentence: &'static str, expected: usize, got: usize },
    #[error("{sentence}: bad {field} {value:?}")]
    BadField { sentence: &'static str, field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Rmc(GpsFeedback),
    Gga(FixStatus),
    /// Well-formed, but not a type we decode. Carries the address (`GPGSV`, ...).
    Other(String),
}

/// Decodes one line, with or without its trailing CR/LF.
pub fn parse(line: &str) -> Result<Sentence, NmeaError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.is_ascii() {
        return Err(NmeaError::NotASentence(line.to_string()));
    }
    let body = line
        .strip_prefix('$')
        .ok_or_else(|| NmeaError::NotASentence(line.to_string()))?;
    let (data, sum) = body
        .rsplit_once('*')
        .ok_or_else(|| NmeaError::MissingChecksum(line.to_string()))?;
    let expected = u8::from_str_radix(sum, 16).map_err(|_| NmeaError::BadChecksumField(sum.to_string()))?;
    let computed = data.bytes().fold(0u8, |acc, b| acc ^ b);
    if expected != computed {
        return Err(NmeaError::ChecksumMismatch { expected, computed });
    }

    let fields: Vec<&str> = data.split(',').collect();
    let address = fields[0];
    if address.len() < 5 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(NmeaError::NotASentence(line.to_string()));
    }
    // talker (GP, GN, GL, ...) is ignored
    match &address[address.len() - 3..] {
        "RMC" => parse_rmc(&fields).map(Sentence::Rmc),
        "GGA" => parse_gga(&fields).map(Sentence::Gga),
        _ => Ok(Sentence::Other(address.to_string())),
    }
}

// $--RMC,time,status,lat,N/S,lon,E/W,speed,course,date,magvar,E/W[,mode]
fn parse_rmc(f: &[&str]) -> Result<GpsFeedback, NmeaError> {
    const S: &str = "RMC";
    if f.len() < 10 {
        return Err(NmeaError::TooShort { sentence: S, expected: 10, got: f.len() });
    }
    Ok(GpsFeedback {
        time: f[1].to_string(),
        validity: f[2] == "A",
        latitude: coordinate(S, "latitude", f[3], f[4])?,
        longitude: coordinate(S, "longitude", f[5], f[6])?,
        speed: number(S, "speed", f[7])?,
        heading: number(S, "course", f[8])?,
        date: f[9].to_string(),
    })
}

// $--GGA,time,lat,N/S,lon,E/W,quality,...
fn parse_gga(f: &[&str]) -> Result<FixStatus, NmeaError> {
    const S: &str = "GGA";
    if f.len() < 7 {
        return Err(NmeaError::TooShort { sentence: S, expected: 7, got: f.len() });
    }
    if f[6].is_empty() {
        return Ok(FixStatus::NoFix);
    }
    let quality: u8 = f[6]
        .parse()
        .map_err(|_| NmeaError::BadField { sentence: S, field: "quality", value: f[6].to_string() })?;
    Ok(FixStatus::from(quality))
}

/// Empty fields read as 0, which is what receivers send before a fix.
fn number(sentence: &'static str, field: &'static str, v: &str) -> Result<f64, NmeaError> {
    if v.is_empty() {
        return Ok(0.0);
    }
    finite(v)
        .ok_or_else(|| NmeaError::BadField { sentence, field, value: v.to_string() })
}

// f64::from_str also accepts "NaN" and "inf"
fn finite(v: &str) -> Option<f64> {
    v.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere, to signed decimal degrees.
fn coordinate(sentence: &'static str, field: &'static str, v: &str, hemi: &str) -> Result<f64, NmeaError> {
    if v.is_empty() {
        return Ok(0.0);
    }
    let bad = || NmeaError::BadField { sentence, field, value: v.to_string() };
    let dot = v.find('.').unwrap_or(v.len());
    if dot < 3 {
        return Err(bad());
    }
    let deg_len = dot - 2;
    let deg = finite(&v[..deg_len]).ok_or_else(bad)?;
    let min = finite(&v[deg_len..]).ok_or_else(bad)?;
    let out = deg + min / 60.0;
    match hemi {
        "S" | "W" => Ok(-out),
        _ => Ok(out),
    }
}
