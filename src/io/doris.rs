//! DORIS ODR-style binary orbit files: a magic token, two fixed headers
//! (product identity, then record count and version), then exactly N
//! fixed-width records of coarse-quantized time/lat/lon/height payloads.

use crate::core::geodesy::geodetic_to_cartesian;
use crate::core::interpolate::OrbitVectors;
use crate::io::binary::BinaryReader;
use crate::types::{DecodeQualification, FmtResult, FormatError, OrbitVector};
use chrono::{Duration, TimeZone, Utc};
use std::io::{Read, Seek};

/// File magic at offset 0.
pub const ODR_MAGIC: &[u8; 4] = b"xODR";
/// Seconds in each data record count from this epoch.
const EPOCH_2000_UNIX_SECONDS: i64 = 946_684_800;

const PRODUCT_ID_LEN: usize = 8;
/// magic + product id + record count + version
const HEADER_LEN: u64 = 4 + PRODUCT_ID_LEN as u64 + 4 + 4;
/// time, lat, lon, height as big-endian i32
const DATA_RECORD_LEN: u64 = 16;

/// Parsed ODR product: identity headers plus time-ordered state vectors.
#[derive(Debug)]
pub struct OdrFile {
    pub product_id: String,
    pub version: i32,
    pub orbit: OrbitVectors,
}

/// Cheap probe: the four magic bytes only.
pub fn qualification(head: &[u8]) -> DecodeQualification {
    if head.len() >= 4 && &head[..4] == ODR_MAGIC {
        DecodeQualification::Intended
    } else {
        DecodeQualification::Unable
    }
}

impl OdrFile {
    /// Parse a complete ODR file.
    ///
    /// Data records hold scaled integers: seconds since 2000-01-01T00:00 UT,
    /// latitude/longitude in microdegrees and height in millimeters. They
    /// are converted to ECEF meters; velocities come from symmetric
    /// differencing of neighbor positions.
    pub fn read<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FmtResult<OdrFile> {
        let magic = reader.read_ascii_string(4)?;
        if magic.as_bytes() != ODR_MAGIC {
            return Err(FormatError::Header(format!(
                "not an ODR file: magic {:?}",
                magic
            )));
        }

        let product_id = reader.read_ascii_string(PRODUCT_ID_LEN)?.trim().to_string();
        let num_records = reader.read_b4()?;
        let version = reader.read_b4()?;
        if num_records <= 0 {
            return Err(FormatError::Header(format!(
                "ODR header declares {} records",
                num_records
            )));
        }
        let expected = HEADER_LEN + num_records as u64 * DATA_RECORD_LEN;
        if reader.length() < expected {
            return Err(FormatError::Header(format!(
                "ODR file is {} bytes but {} records need {}",
                reader.length(),
                num_records,
                expected
            )));
        }
        log::info!(
            "reading ODR product '{}' v{}: {} state vector records",
            product_id,
            version,
            num_records
        );

        let epoch = Utc.timestamp_opt(EPOCH_2000_UNIX_SECONDS, 0).unwrap();
        let mut times = Vec::with_capacity(num_records as usize);
        let mut positions = Vec::with_capacity(num_records as usize);
        for _ in 0..num_records {
            let seconds = reader.read_b4()?;
            let lat = reader.read_b4()? as f64 * 1e-6;
            let lon = reader.read_b4()? as f64 * 1e-6;
            let height = reader.read_b4()? as f64 * 1e-3;
            times.push(epoch + Duration::seconds(i64::from(seconds)));
            positions.push(geodetic_to_cartesian(lat, lon, height));
        }

        // Symmetric differences interior, one-sided at the ends.
        let n = positions.len();
        let mut vectors = Vec::with_capacity(n);
        for i in 0..n {
            let (lo, hi) = if i == 0 {
                (0, 1.min(n - 1))
            } else if i == n - 1 {
                (n - 2, n - 1)
            } else {
                (i - 1, i + 1)
            };
            let dt = (times[hi] - times[lo]).num_milliseconds() as f64 / 1000.0;
            let velocity = if dt > 0.0 {
                [
                    (positions[hi][0] - positions[lo][0]) / dt,
                    (positions[hi][1] - positions[lo][1]) / dt,
                    (positions[hi][2] - positions[lo][2]) / dt,
                ]
            } else {
                [0.0; 3]
            };
            vectors.push(OrbitVector::new(times[i], positions[i], velocity));
        }

        // Monotonicity is validated here, before anyone interpolates.
        let orbit = OrbitVectors::new(vectors)?;
        Ok(OdrFile {
            product_id,
            version,
            orbit,
        })
    }
}
