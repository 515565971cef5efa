use crate::core::metadata::AbstractedMetadata;
use crate::io::binary::BinaryReader;
use crate::io::record::{BinaryRecord, SchemaCache, SchemaKey};
use crate::product::{BandInfo, Product};
use crate::types::{DataType, DecodeQualification, FmtResult, FormatError};
use std::io::{Read, Seek};

/// CEOS record type codes carried in byte 5 of the 12-byte record prefix.
pub const VOLUME_DESCRIPTOR_TYPE: u8 = 192;
pub const FILE_DESCRIPTOR_TYPE: u8 = 63;
pub const DATASET_SUMMARY_TYPE: u8 = 10;

/// How many occurrences of a record type to expect.
#[derive(Debug, Clone)]
pub enum RecordCount {
    One,
    Fixed(usize),
    /// Count resolved from a field of an earlier record in the same file
    /// (e.g. band count determines the number of per-band sub-records).
    FromField { record: String, field: String },
}

/// One expected record type in file order.
#[derive(Debug, Clone)]
pub struct ExpectedRecord {
    pub record_type: String,
    pub count: RecordCount,
}

/// Per-mission file layout: which record types appear, in what order and
/// counts. Replaces per-mission reader subclasses; a new mission is a new
/// config plus schema resources, not new parsing code.
#[derive(Debug, Clone)]
pub struct CeosFormatConfig {
    pub mission: String,
    pub records: Vec<ExpectedRecord>,
}

impl CeosFormatConfig {
    /// ERS-style volume directory file: a single volume descriptor.
    pub fn ers_volume() -> Self {
        Self {
            mission: "ers".to_string(),
            records: vec![ExpectedRecord {
                record_type: "volume_descriptor".to_string(),
                count: RecordCount::One,
            }],
        }
    }

    /// ERS-style leader file: file descriptor, then as many dataset summary
    /// records as the descriptor declares.
    pub fn ers_leader() -> Self {
        Self {
            mission: "ers".to_string(),
            records: vec![
                ExpectedRecord {
                    record_type: "leader_file_descriptor".to_string(),
                    count: RecordCount::One,
                },
                ExpectedRecord {
                    record_type: "dataset_summary".to_string(),
                    count: RecordCount::FromField {
                        record: "leader_file_descriptor".to_string(),
                        field: "Dataset summary record count".to_string(),
                    },
                },
            ],
        }
    }

    /// ERS-style trailer file: a single trailer descriptor.
    pub fn ers_trailer() -> Self {
        Self {
            mission: "ers".to_string(),
            records: vec![ExpectedRecord {
                record_type: "trailer_descriptor".to_string(),
                count: RecordCount::One,
            }],
        }
    }
}

/// Cheap probe of a CEOS volume directory file: record type code plus the
/// ASCII flag, taken from the fixed 14-byte prefix. Peek only.
pub fn qualification(head: &[u8]) -> DecodeQualification {
    if head.len() < 14 {
        return DecodeQualification::Unable;
    }
    if head[5] != VOLUME_DESCRIPTOR_TYPE {
        return DecodeQualification::Unable;
    }
    if &head[12..14] == b"A " {
        DecodeQualification::Intended
    } else {
        DecodeQualification::Suitable
    }
}

/// The parsed records of one CEOS file, in file order.
#[derive(Debug)]
pub struct CeosRecordSet {
    mission: String,
    records: Vec<(String, BinaryRecord)>,
}

impl CeosRecordSet {
    /// Read every expected record, resolving cross-referenced counts as the
    /// file unfolds. Each record is reached by seeking to the previous
    /// record's end position, never by cumulative byte arithmetic.
    pub fn read<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        cache: &SchemaCache,
        config: &CeosFormatConfig,
    ) -> FmtResult<CeosRecordSet> {
        let mut records: Vec<(String, BinaryRecord)> = Vec::new();

        for expected in &config.records {
            let count = match &expected.count {
                RecordCount::One => 1,
                RecordCount::Fixed(n) => *n,
                RecordCount::FromField { record, field } => {
                    let source = records
                        .iter()
                        .find(|(name, _)| name == record)
                        .map(|(_, r)| r)
                        .ok_or_else(|| {
                            FormatError::Schema(format!(
                                "count of '{}' references record '{}' which was not yet parsed",
                                expected.record_type, record
                            ))
                        })?;
                    let n = source.get_int(field)?;
                    if n < 0 {
                        return Err(FormatError::Header(format!(
                            "record count field '{}' is negative: {}",
                            field, n
                        )));
                    }
                    n as usize
                }
            };

            let schema = cache.get(&SchemaKey::new(&config.mission, &expected.record_type))?;
            for _ in 0..count {
                let record = BinaryRecord::read(reader, schema.clone())?;
                reader.seek(record.end_position())?;
                records.push((expected.record_type.clone(), record));
            }
            log::debug!(
                "read {} '{}' record(s) for mission '{}'",
                count,
                expected.record_type,
                config.mission
            );
        }

        Ok(CeosRecordSet {
            mission: config.mission.clone(),
            records,
        })
    }

    pub fn mission(&self) -> &str {
        &self.mission
    }

    /// First record of a type; absence is a format error for the file.
    pub fn record(&self, record_type: &str) -> FmtResult<&BinaryRecord> {
        self.records
            .iter()
            .find(|(name, _)| name == record_type)
            .map(|(_, r)| r)
            .ok_or_else(|| FormatError::Header(format!("no '{}' record in file", record_type)))
    }

    pub fn records_of(&self, record_type: &str) -> Vec<&BinaryRecord> {
        self.records
            .iter()
            .filter(|(name, _)| name == record_type)
            .map(|(_, r)| r)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A parsed ERS-style leader file.
#[derive(Debug)]
pub struct CeosLeader {
    records: CeosRecordSet,
}

impl CeosLeader {
    pub fn read<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        cache: &SchemaCache,
    ) -> FmtResult<CeosLeader> {
        let records = CeosRecordSet::read(reader, cache, &CeosFormatConfig::ers_leader())?;
        // The leader is useless without at least one dataset summary.
        records.record("dataset_summary")?;
        Ok(CeosLeader { records })
    }

    pub fn records(&self) -> &CeosRecordSet {
        &self.records
    }

    pub fn dataset_summary(&self) -> FmtResult<&BinaryRecord> {
        self.records.record("dataset_summary")
    }

    /// Map per-format dataset-summary fields into the cross-format
    /// abstracted vocabulary.
    pub fn abstracted_metadata(&self) -> FmtResult<AbstractedMetadata> {
        let summary = self.dataset_summary()?;
        let mut meta = AbstractedMetadata::new();

        meta.set_string("PRODUCT", &summary.get_string("Scene identifier")?);
        meta.set_string("MISSION", &summary.get_string("Mission identifier")?);
        meta.set_string("SENSOR", &summary.get_string("Sensor identifier")?);
        meta.set_string(
            "PROCESSING_FACILITY",
            &summary.get_string("Processing facility identifier")?,
        );
        let pass = summary.get_string("Ascending or descending flag")?;
        meta.set_string(
            "PASS",
            if pass.starts_with('A') { "ASCENDING" } else { "DESCENDING" },
        );

        meta.set_int("ABS_ORBIT", summary.get_int("Orbit number")?);
        meta.set_int(
            "num_samples_per_line",
            summary.get_int("Number of samples per line")?,
        );
        meta.set_int("num_output_lines", summary.get_int("Number of lines")?);
        meta.set_int("num_bands", summary.get_int("Number of SAR channels")?);

        meta.set_double("centre_lat", summary.get_double("Scene centre latitude")?);
        meta.set_double("centre_lon", summary.get_double("Scene centre longitude")?);
        meta.set_double("centre_heading", summary.get_double("Scene centre heading")?);
        meta.set_double(
            "radar_frequency",
            summary.get_double("Radar frequency in GHz")?,
        );
        meta.set_double(
            "radar_wavelength",
            summary.get_double("Radar wavelength in metres")?,
        );
        meta.set_double(
            "pulse_repetition_frequency",
            summary.get_double("Pulse repetition frequency in Hz")?,
        );
        meta.set_double(
            "range_sampling_rate",
            summary.get_double("Range sampling rate in MHz")?,
        );
        meta.set_double(
            "range_spacing",
            summary.get_double("Range pixel spacing in metres")?,
        );
        meta.set_double(
            "azimuth_spacing",
            summary.get_double("Azimuth pixel spacing in metres")?,
        );
        meta.set_double(
            "slant_range_to_first_pixel",
            summary.get_double("Slant range to first sample in metres")?,
        );
        meta.set_double(
            "incidence_near",
            summary.get_double("Incidence angle at scene centre")?,
        );
        meta.set_double(
            "incidence_angle_const_term",
            summary.get_double("Incidence angle constant term")?,
        );
        meta.set_double(
            "incidence_angle_linear_term",
            summary.get_double("Incidence angle linear term")?,
        );
        meta.set_double(
            "incidence_angle_quadratic_term",
            summary.get_double("Incidence angle quadratic term")?,
        );

        let centre_time = summary.get_utc("Scene centre time")?;
        if centre_time.timestamp() != 0 {
            meta.set_utc("first_line_time", centre_time);
        }

        Ok(meta)
    }

    /// Build a target product from the dataset summary: dimensions, one
    /// band per SAR channel with deterministic names, and the abstracted
    /// metadata tree attached.
    pub fn to_product(&self) -> FmtResult<Product> {
        let summary = self.dataset_summary()?;

        let samples = summary.get_int("Number of samples per line")?;
        let lines = summary.get_int("Number of lines")?;
        let channels = summary.get_int("Number of SAR channels")?;
        if samples <= 0 || lines <= 0 || channels <= 0 {
            return Err(FormatError::Header(format!(
                "dataset summary declares non-positive dimensions: {}x{}, {} channels",
                samples, lines, channels
            )));
        }

        let scene_id = summary.get_string("Scene identifier")?;
        let mut product = Product::new(&scene_id, samples as usize, lines as usize);

        for name in crate::io::envi::default_band_names(channels as usize) {
            product.add_band(BandInfo {
                name: name.clone(),
                description: None,
                unit: crate::io::envi::unit_from_band_name(&name).to_string(),
                data_type: DataType::Int16,
                width: samples as usize,
                height: lines as usize,
            });
        }

        let meta = self.abstracted_metadata()?;
        meta.attach_to(&mut product);
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ascii_field(value: &str, width: usize) -> Vec<u8> {
        let mut bytes = vec![b' '; width];
        let v = value.as_bytes();
        bytes[..v.len().min(width)].copy_from_slice(&v[..v.len().min(width)]);
        bytes
    }

    fn right_aligned(value: &str, width: usize) -> Vec<u8> {
        let mut bytes = vec![b' '; width];
        let v = value.as_bytes();
        bytes[width - v.len()..].copy_from_slice(v);
        bytes
    }

    fn prefix(seq: i32, type_code: u8, length: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&seq.to_be_bytes());
        bytes.extend_from_slice(&[18, type_code, 18, 18]);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes
    }

    fn volume_file() -> Vec<u8> {
        let mut bytes = prefix(1, VOLUME_DESCRIPTOR_TYPE, 360);
        bytes.extend_from_slice(b"A ");
        bytes.resize(360, b' ');
        bytes
    }

    fn leader_file() -> Vec<u8> {
        // Leader file descriptor declaring one dataset summary record.
        let mut bytes = prefix(1, FILE_DESCRIPTOR_TYPE, 720);
        bytes.extend_from_slice(b"A ");
        bytes.resize(720, b' ');
        // "Dataset summary record count" sits at offset 180, width 6.
        bytes[180..186].copy_from_slice(b"     1");
        bytes[186..192].copy_from_slice(b"  1886");

        // Dataset summary record.
        let mut summary = prefix(2, DATASET_SUMMARY_TYPE, 1886);
        summary.extend(right_aligned("1", 4));
        summary.extend(right_aligned("1", 4));
        summary.extend(ascii_field("SCENE_42", 32));
        summary.extend(ascii_field("STD", 16));
        summary.extend(ascii_field("20080315123045123456", 32));
        summary.extend(vec![b' '; 16]); // reserved
        summary.extend(right_aligned("47.5", 16));
        summary.extend(right_aligned("11.25", 16));
        summary.extend(right_aligned("193.2", 16));
        summary.extend(ascii_field("WGS84", 16));
        summary.extend(right_aligned("6378.137", 16));
        summary.extend(right_aligned("6356.7523", 16));
        summary.extend(right_aligned("1500", 8));
        summary.extend(right_aligned("2500", 8));
        summary.extend(right_aligned("100.0", 16));
        summary.extend(right_aligned("100.0", 16));
        summary.extend(ascii_field("ERS-2", 16));
        summary.extend(ascii_field("SAR", 32));
        summary.extend(right_aligned("65432", 8));
        summary.extend(ascii_field("DESC", 4));
        summary.extend(right_aligned("23.2", 8));
        summary.extend(right_aligned("5.3", 8));
        summary.extend(right_aligned("0.0565646", 16));
        summary.extend(right_aligned("37.1", 16));
        summary.extend(right_aligned("18.96", 16));
        summary.extend(right_aligned("4900", 8));
        summary.extend(right_aligned("26000", 8));
        summary.extend(right_aligned("1", 4));
        summary.extend(right_aligned("12.5", 16));
        summary.extend(right_aligned("12.5", 16));
        summary.extend(right_aligned("12.5", 16));
        summary.extend(right_aligned("1679.9", 16));
        summary.extend(right_aligned("829924.3", 16));
        summary.extend(right_aligned("22.7", 16));
        summary.extend(right_aligned("0.01", 16));
        summary.extend(right_aligned("-0.0001", 16));
        summary.extend(ascii_field("D-PAF", 16));
        summary.extend(ascii_field("VMP", 8));
        summary.extend(ascii_field("1.1", 8));
        summary.resize(1886, b' ');

        bytes.extend(summary);
        bytes
    }

    #[test]
    fn test_qualification_volume_magic() {
        assert_eq!(qualification(&volume_file()), DecodeQualification::Intended);
        assert_eq!(qualification(b"ENVI\n"), DecodeQualification::Unable);
        assert_eq!(qualification(&[0u8; 4]), DecodeQualification::Unable);
    }

    #[test]
    fn test_volume_descriptor_roundtrip() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(volume_file())).unwrap();
        let set = CeosRecordSet::read(&mut reader, &cache, &CeosFormatConfig::ers_volume()).unwrap();
        let vol = set.record("volume_descriptor").unwrap();
        assert_eq!(vol.get_int("Record sequence number").unwrap(), 1);
        assert_eq!(vol.get_string("ASCII flag").unwrap(), "A");
        assert_eq!(vol.end_position(), 360);
    }

    #[test]
    fn test_leader_cross_referenced_count() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(leader_file())).unwrap();
        let leader = CeosLeader::read(&mut reader, &cache).unwrap();
        assert_eq!(leader.records().records_of("dataset_summary").len(), 1);

        let summary = leader.dataset_summary().unwrap();
        assert_eq!(summary.get_string("Scene identifier").unwrap(), "SCENE_42");
        assert_eq!(summary.get_int("Number of samples per line").unwrap(), 4900);
        assert_eq!(
            summary.get_double("Scene centre latitude").unwrap(),
            47.5
        );
    }

    #[test]
    fn test_abstracted_metadata_mapping() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(leader_file())).unwrap();
        let leader = CeosLeader::read(&mut reader, &cache).unwrap();
        let meta = leader.abstracted_metadata().unwrap();
        assert_eq!(meta.get_string("MISSION").unwrap(), "ERS-2");
        assert_eq!(meta.get_string("PASS").unwrap(), "DESCENDING");
        assert_eq!(meta.get_double("range_spacing").unwrap(), 12.5);
        assert_eq!(meta.get_double("incidence_angle_const_term").unwrap(), 22.7);
        assert!(meta.degradations().is_empty());
    }

    #[test]
    fn test_to_product() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(leader_file())).unwrap();
        let leader = CeosLeader::read(&mut reader, &cache).unwrap();
        let product = leader.to_product().unwrap();
        assert_eq!(product.name, "SCENE_42");
        assert_eq!(product.width, 4900);
        assert_eq!(product.height, 26000);
        assert_eq!(product.bands().len(), 1);
        assert_eq!(product.bands()[0].name, "Band");
    }

    #[test]
    fn test_missing_record_is_fatal() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(volume_file())).unwrap();
        let set = CeosRecordSet::read(&mut reader, &cache, &CeosFormatConfig::ers_volume()).unwrap();
        assert!(set.record("dataset_summary").is_err());
    }

    #[test]
    fn test_scene_centre_time_is_typed() {
        let cache = SchemaCache::with_builtin_resources();
        let mut reader = BinaryReader::new(Cursor::new(leader_file())).unwrap();
        let leader = CeosLeader::read(&mut reader, &cache).unwrap();
        let t = leader
            .dataset_summary()
            .unwrap()
            .get_utc("Scene centre time")
            .unwrap();
        assert_eq!(t.to_rfc3339(), "2008-03-15T12:30:45.123456+00:00");
    }
}
