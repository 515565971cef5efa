use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Geodetic position in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPos {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Continuous pixel position (column x, row y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Orbit state vector: a timestamped position+velocity sample.
///
/// The UTC calendar time is kept for format boundaries; all interpolation
/// arithmetic uses the Modified Julian Day double.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitVector {
    pub utc: DateTime<Utc>,
    pub mjd: f64,
    pub position: [f64; 3], // [x, y, z] in meters
    pub velocity: [f64; 3], // [vx, vy, vz] in m/s
}

impl OrbitVector {
    pub fn new(utc: DateTime<Utc>, position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self {
            utc,
            mjd: mjd_from_utc(utc),
            position,
            velocity,
        }
    }
}

/// Days between the MJD epoch (1858-11-17T00:00:00 UTC) and the Unix epoch.
const MJD_UNIX_OFFSET_DAYS: f64 = 40587.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a UTC calendar time to Modified Julian Day.
pub fn mjd_from_utc(utc: DateTime<Utc>) -> f64 {
    let micros = utc.timestamp_micros() as f64;
    MJD_UNIX_OFFSET_DAYS + micros / (SECONDS_PER_DAY * 1e6)
}

/// Convert a Modified Julian Day back to UTC calendar time.
pub fn utc_from_mjd(mjd: f64) -> DateTime<Utc> {
    let micros = (mjd - MJD_UNIX_OFFSET_DAYS) * SECONDS_PER_DAY * 1e6;
    Utc.timestamp_micros(micros.round() as i64).unwrap()
}

/// Sample data types found in satellite product headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    UInt8,
    Int16,
    Int32,
    Float32,
    Float64,
    UInt16,
    UInt32,
    Int64,
    UInt64,
}

impl DataType {
    /// Size of a single sample in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Float64 | DataType::Int64 | DataType::UInt64 => 8,
        }
    }
}

/// Sample byte order declared by a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleByteOrder {
    LittleEndian,
    BigEndian,
}

/// Band interleave layout for raster payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interleave {
    Bsq,
    Bil,
    Bip,
}

/// Outcome of a cheap format-identity probe.
///
/// The dispatch layer prefers `Intended` readers, falls back to `Suitable`
/// ones, and never hands a file to an `Unable` reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecodeQualification {
    Unable,
    Suitable,
    Intended,
}

/// Recoverable parse degradations, collected rather than thrown.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// An optional header section was absent; defaults were synthesized.
    MissingOptionalSection { format: String, section: String },
    /// A metadata attribute was set without being declared first.
    UnmappedAttribute { name: String },
    /// A band name was rewritten to a valid identifier.
    SanitizedBandName { original: String, sanitized: String },
}

/// Error types for format decoding and geolocation.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read at byte offset {offset}")]
    ShortRead { offset: u64 },

    #[error("unparseable ASCII numeral {text:?} at byte offset {offset}")]
    AsciiNumeral { text: String, offset: u64 },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("unknown field '{field}' in record '{record}'")]
    UnknownField { record: String, field: String },

    #[error("header error: {0}")]
    Header(String),

    #[error("orbit time array is not strictly monotonic")]
    NonMonotonicTime,

    #[error("time {mjd} outside available orbit range [{start}, {end}]")]
    OutOfRange { mjd: f64, start: f64, end: f64 },

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("read cancelled")]
    Cancelled,
}

impl FormatError {
    /// Attach record/field context to a low-level read failure so a failure
    /// deep in record parsing is diagnosable without a stack walk.
    pub fn in_field(self, record: &str, field: &str) -> FormatError {
        match self {
            FormatError::ShortRead { offset } => FormatError::Schema(format!(
                "short read in record '{}', field '{}' at byte offset {}",
                record, field, offset
            )),
            FormatError::AsciiNumeral { text, offset } => FormatError::Schema(format!(
                "bad ASCII numeral {:?} in record '{}', field '{}' at byte offset {}",
                text, record, field, offset
            )),
            other => other,
        }
    }
}

/// Result type for format decoding operations.
pub type FmtResult<T> = Result<T, FormatError>;
