//! PRARE PRC-style orbit files: fixed-width 130-byte ASCII records. An
//! identification record and a header record lead a trajectory block whose
//! true length is found by scanning for a terminal sentinel record — the
//! counts stated in the header are unreliable in the wild.

use crate::core::interpolate::OrbitVectors;
use crate::io::binary::BinaryReader;
use crate::types::{DecodeQualification, FmtResult, FormatError, OrbitVector};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::{Read, Seek};

/// Every PRC record is this many ASCII bytes.
pub const RECORD_LEN: u64 = 130;
/// A trajectory-record slot beginning with this token terminates the block.
pub const SENTINEL: &[u8; 4] = b"$$$$";
/// Identification records open with this token.
pub const PRC_MAGIC: &str = "PRC";

const TIME_WIDTH: usize = 14;
const POSITION_WIDTH: usize = 16;
const VELOCITY_WIDTH: usize = 12;

/// Parsed PRC product header fields.
#[derive(Debug, Clone)]
pub struct PrcHeader {
    pub dataset_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quality: i64,
}

/// Parsed PRC orbit file.
#[derive(Debug)]
pub struct PrcFile {
    pub header: PrcHeader,
    pub orbit: OrbitVectors,
}

/// Cheap probe: leading identification token only.
pub fn qualification(head: &[u8]) -> DecodeQualification {
    if head.len() >= 3 && &head[..3] == PRC_MAGIC.as_bytes() {
        DecodeQualification::Intended
    } else {
        DecodeQualification::Unable
    }
}

fn parse_prc_time(text: &str, what: &str) -> FmtResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), "%Y%m%d%H%M%S")
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .map_err(|_| FormatError::Header(format!("bad PRC {} epoch {:?}", what, text)))
}

/// Count trajectory records by walking record boundaries until the
/// byte-level sentinel match, then derive the count from the discovered
/// sentinel position. The reader's position is restored afterwards.
pub fn compute_number_of_records<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
) -> FmtResult<usize> {
    let saved = reader.position()?;
    let mut pos = 2 * RECORD_LEN;
    let found = loop {
        if pos + 4 > reader.length() {
            break None;
        }
        reader.seek(pos)?;
        let token = reader.read_ascii_string(4)?;
        if token.as_bytes() == SENTINEL {
            break Some(pos);
        }
        pos += RECORD_LEN;
    };
    reader.seek(saved)?;

    let sentinel_pos = found.ok_or_else(|| {
        FormatError::Header("PRC file has no terminal sentinel record".to_string())
    })?;
    Ok(((sentinel_pos - 2 * RECORD_LEN) / RECORD_LEN) as usize)
}

impl PrcFile {
    pub fn read<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FmtResult<PrcFile> {
        // Identification record.
        reader.seek(0)?;
        let ident = reader.read_ascii_string(RECORD_LEN as usize)?;
        if !ident.starts_with(PRC_MAGIC) {
            // Char-wise truncation: high bytes widen to multi-byte chars.
            let head: String = ident.chars().take(8).collect();
            return Err(FormatError::Header(format!(
                "not a PRC file: identification record starts {:?}",
                head
            )));
        }
        let dataset_id = ident.chars().take(16).collect::<String>().trim().to_string();

        // Header record: start epoch, end epoch, quality flag.
        reader.seek(RECORD_LEN)?;
        let start = parse_prc_time(&reader.read_ascii_string(TIME_WIDTH)?, "start")?;
        let end = parse_prc_time(&reader.read_ascii_string(TIME_WIDTH)?, "end")?;
        let quality = reader.read_ascii_int(4)?;
        let header = PrcHeader {
            dataset_id,
            start,
            end,
            quality,
        };

        let num_records = compute_number_of_records(reader)?;
        if num_records == 0 {
            return Err(FormatError::Header(
                "PRC file contains no trajectory records".to_string(),
            ));
        }
        log::info!(
            "reading PRC dataset '{}': {} trajectory records, {} to {}",
            header.dataset_id,
            num_records,
            header.start.format("%Y-%m-%d %H:%M:%S"),
            header.end.format("%Y-%m-%d %H:%M:%S")
        );

        let mut vectors = Vec::with_capacity(num_records);
        for i in 0..num_records {
            let record_start = (2 + i as u64) * RECORD_LEN;
            reader.seek(record_start)?;
            let utc = parse_prc_time(&reader.read_ascii_string(TIME_WIDTH)?, "trajectory")?;
            let mut position = [0.0; 3];
            for slot in &mut position {
                *slot = reader.read_ascii_float(POSITION_WIDTH)?;
            }
            let mut velocity = [0.0; 3];
            for slot in &mut velocity {
                *slot = reader.read_ascii_float(VELOCITY_WIDTH)?;
            }
            vectors.push(OrbitVector::new(utc, position, velocity));
        }

        let orbit = OrbitVectors::new(vectors)?;
        Ok(PrcFile { header, orbit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mjd_from_utc;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn record(content: &str) -> Vec<u8> {
        let mut bytes = content.as_bytes().to_vec();
        assert!(bytes.len() <= RECORD_LEN as usize);
        bytes.resize(RECORD_LEN as usize, b' ');
        bytes
    }

    fn synthetic_prc(num_trajectory: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(record("PRC100 ERS2 D-PAF"));
        bytes.extend(record("20080315000000200803160000000001"));
        for i in 0..num_trajectory {
            let line = format!(
                "{:14}{:>16.3}{:>16.3}{:>16.3}{:>12.4}{:>12.4}{:>12.4}",
                format!("200803150{:05}", i * 100),
                7_000_000.0 - i as f64 * 1000.0,
                100.0 + i as f64,
                -2_000.0 * i as f64,
                -10.5,
                0.25,
                7450.0
            );
            bytes.extend(record(&line));
        }
        bytes.extend(record("$$$$ END OF DATA"));
        bytes
    }

    #[test]
    fn test_qualification() {
        assert_eq!(
            qualification(&synthetic_prc(3)),
            DecodeQualification::Intended
        );
        assert_eq!(qualification(b"xODR"), DecodeQualification::Unable);
    }

    #[test]
    fn test_sentinel_scan_counts_exactly() {
        for k in [1usize, 3, 7] {
            let mut reader = BinaryReader::new(Cursor::new(synthetic_prc(k))).unwrap();
            assert_eq!(compute_number_of_records(&mut reader).unwrap(), k);
        }
    }

    #[test]
    fn test_scan_preserves_position() {
        let mut reader = BinaryReader::new(Cursor::new(synthetic_prc(3))).unwrap();
        reader.seek(42).unwrap();
        compute_number_of_records(&mut reader).unwrap();
        assert_eq!(reader.position().unwrap(), 42);
    }

    #[test]
    fn test_missing_sentinel_is_fatal() {
        let mut bytes = synthetic_prc(3);
        bytes.truncate(bytes.len() - RECORD_LEN as usize);
        let mut reader = BinaryReader::new(Cursor::new(bytes)).unwrap();
        assert!(compute_number_of_records(&mut reader).is_err());
    }

    #[test]
    fn test_high_bytes_in_identification_record() {
        // Producers sometimes pad identification records with raw binary;
        // bytes >= 0x80 widen to multi-byte chars and must not break the
        // fixed-width slicing on either branch.
        let mut bytes = synthetic_prc(2);
        for b in &mut bytes[3..RECORD_LEN as usize] {
            *b = 0xFF;
        }
        let mut reader = BinaryReader::new(Cursor::new(bytes.clone())).unwrap();
        let prc = PrcFile::read(&mut reader).unwrap();
        assert_eq!(prc.orbit.len(), 2);
        assert_eq!(prc.header.dataset_id.chars().count(), 16);

        // Same bytes with a broken magic: an error, never a panic.
        bytes[0] = 0xFF;
        let mut reader = BinaryReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            PrcFile::read(&mut reader),
            Err(FormatError::Header(_))
        ));
    }

    #[test]
    fn test_full_parse() {
        let mut reader = BinaryReader::new(Cursor::new(synthetic_prc(5))).unwrap();
        let prc = PrcFile::read(&mut reader).unwrap();
        assert_eq!(prc.header.dataset_id, "PRC100 ERS2 D-PA");
        assert_eq!(prc.header.quality, 1);
        assert_eq!(
            prc.header.start,
            Utc.with_ymd_and_hms(2008, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(prc.orbit.len(), 5);
        let v = prc.orbit.vectors()[2];
        assert_abs_diff_eq!(v.position[0], 6_998_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v.velocity[2], 7450.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lagrange_lookup_on_parsed_orbit() {
        let mut reader = BinaryReader::new(Cursor::new(synthetic_prc(6))).unwrap();
        let prc = PrcFile::read(&mut reader).unwrap();
        // Exactly on a sample epoch: the sample comes back.
        let t = mjd_from_utc(Utc.with_ymd_and_hms(2008, 3, 15, 0, 2, 0).unwrap());
        let v = prc.orbit.at_lagrange(t).unwrap();
        assert_abs_diff_eq!(v.position[0], 6_998_000.0, epsilon = 1e-6);
        // Before the first record: refused.
        let early = mjd_from_utc(Utc.with_ymd_and_hms(2008, 3, 14, 0, 0, 0).unwrap());
        assert!(prc.orbit.at_lagrange(early).is_err());
    }
}
