use crate::io::binary::BinaryReader;
use crate::io::schema::{FieldKind, RecordSchema};
use crate::types::{FmtResult, FormatError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::sync::Arc;

/// Tagged value of one parsed record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Double(f64),
    Str(String),
    Utc(DateTime<Utc>),
}

/// Parse a fixed-width ASCII timestamp (`yyyyMMddHHmmss` with optional
/// 3- or 6-digit fractional seconds); a couple of producer variants are
/// accepted.
pub fn parse_ascii_utc(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    for format in ["%Y%m%d%H%M%S%6f", "%Y%m%d%H%M%S%3f", "%Y%m%d%H%M%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

/// One occurrence of a fixed-format record, built once and immutable.
///
/// Field values are stored in schema order; reserved gap bytes are skipped
/// so the stream always advances by exactly the schema's record length.
#[derive(Debug, Clone)]
pub struct BinaryRecord {
    schema: Arc<RecordSchema>,
    start_pos: u64,
    values: Vec<Option<FieldValue>>,
}

impl BinaryRecord {
    /// Read a record at the reader's current position. The reader is left
    /// positioned at `start + record_length` regardless of how many bytes
    /// the declared fields cover.
    pub fn read<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        schema: Arc<RecordSchema>,
    ) -> FmtResult<BinaryRecord> {
        let start_pos = reader.position()?;
        let mut values = Vec::with_capacity(schema.fields.len());

        for field in &schema.fields {
            let value = match field.kind {
                FieldKind::BinaryInt => reader
                    .read_binary_int(field.width)
                    .map(|v| Some(FieldValue::Int(v))),
                FieldKind::BinaryUint => reader
                    .read_binary_uint(field.width)
                    .map(|v| Some(FieldValue::Int(v as i64))),
                FieldKind::BinaryFloat => reader
                    .read_binary_float(field.width)
                    .map(|v| Some(FieldValue::Double(v))),
                FieldKind::AsciiInt => reader
                    .read_ascii_int(field.width)
                    .map(|v| Some(FieldValue::Int(v))),
                FieldKind::AsciiFloat => reader
                    .read_ascii_float(field.width)
                    .map(|v| Some(FieldValue::Double(v))),
                FieldKind::AsciiString => reader
                    .read_ascii_string(field.width)
                    .map(|v| Some(FieldValue::Str(v.trim().to_string()))),
                FieldKind::AsciiUtc => {
                    let offset = reader.position()?;
                    reader.read_ascii_string(field.width).and_then(|v| {
                        let trimmed = v.trim();
                        if trimmed.is_empty() {
                            // Epoch-0 sentinel, like the no-data metadata placeholder.
                            Ok(Some(FieldValue::Utc(Utc.timestamp_opt(0, 0).unwrap())))
                        } else {
                            parse_ascii_utc(trimmed)
                                .map(|t| Some(FieldValue::Utc(t)))
                                .ok_or(FormatError::AsciiNumeral {
                                    text: trimmed.to_string(),
                                    offset,
                                })
                        }
                    })
                }
                FieldKind::Skip => reader.skip(field.width as i64).map(|_| None),
            }
            .map_err(|e| e.in_field(&schema.name, &field.name))?;
            values.push(value);
        }

        // Reseek rather than trusting cumulative arithmetic; this also
        // covers reserved gap bytes after the last declared field.
        reader.seek(start_pos + schema.record_length)?;

        Ok(BinaryRecord {
            schema,
            start_pos,
            values,
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Absolute stream offset immediately after this record. Callers seek
    /// here to reach the next record deterministically.
    pub fn end_position(&self) -> u64 {
        self.start_pos + self.schema.record_length
    }

    pub fn start_position(&self) -> u64 {
        self.start_pos
    }

    fn lookup(&self, name: &str) -> FmtResult<&FieldValue> {
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            if field.name == name {
                return value.as_ref().ok_or_else(|| FormatError::UnknownField {
                    record: self.schema.name.clone(),
                    field: format!("{} (reserved field)", name),
                });
            }
        }
        Err(FormatError::UnknownField {
            record: self.schema.name.clone(),
            field: name.to_string(),
        })
    }

    pub fn get_string(&self, name: &str) -> FmtResult<String> {
        match self.lookup(name)? {
            FieldValue::Str(s) => Ok(s.clone()),
            FieldValue::Int(v) => Ok(v.to_string()),
            FieldValue::Double(v) => Ok(v.to_string()),
            FieldValue::Utc(t) => Ok(t.to_rfc3339()),
        }
    }

    pub fn get_int(&self, name: &str) -> FmtResult<i64> {
        match self.lookup(name)? {
            FieldValue::Int(v) => Ok(*v),
            FieldValue::Double(v) => Ok(*v as i64),
            other => Err(FormatError::Schema(format!(
                "field '{}' of record '{}' holds {:?}, not an integer",
                name, self.schema.name, other
            ))),
        }
    }

    pub fn get_double(&self, name: &str) -> FmtResult<f64> {
        match self.lookup(name)? {
            FieldValue::Double(v) => Ok(*v),
            FieldValue::Int(v) => Ok(*v as f64),
            other => Err(FormatError::Schema(format!(
                "field '{}' of record '{}' holds {:?}, not a number",
                name, self.schema.name, other
            ))),
        }
    }

    pub fn get_utc(&self, name: &str) -> FmtResult<DateTime<Utc>> {
        match self.lookup(name)? {
            FieldValue::Utc(t) => Ok(*t),
            other => Err(FormatError::Schema(format!(
                "field '{}' of record '{}' holds {:?}, not a timestamp",
                name, self.schema.name, other
            ))),
        }
    }
}

/// Cache key: mission format plus record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub mission: String,
    pub record_type: String,
}

impl SchemaKey {
    pub fn new(mission: &str, record_type: &str) -> Self {
        Self {
            mission: mission.to_string(),
            record_type: record_type.to_string(),
        }
    }
}

/// Process-wide, lazily populated schema cache.
///
/// Populate-once-per-key; after first load a key maps to an immutable
/// shared schema. Registered resources hold the XML text, parsed on first
/// access. Passed explicitly to parsers — no hidden global state.
pub struct SchemaCache {
    resources: RwLock<HashMap<SchemaKey, &'static str>>,
    loaded: RwLock<HashMap<SchemaKey, Arc<RecordSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Cache pre-loaded with the built-in CEOS record definitions.
    pub fn with_builtin_resources() -> Self {
        let cache = Self::new();
        cache.register(
            SchemaKey::new("ers", "volume_descriptor"),
            include_str!("../../resources/ers_volume_descriptor.xml"),
        );
        cache.register(
            SchemaKey::new("ers", "leader_file_descriptor"),
            include_str!("../../resources/ers_leader_file_descriptor.xml"),
        );
        cache.register(
            SchemaKey::new("ers", "dataset_summary"),
            include_str!("../../resources/ers_dataset_summary.xml"),
        );
        cache.register(
            SchemaKey::new("ers", "trailer_descriptor"),
            include_str!("../../resources/ers_trailer_descriptor.xml"),
        );
        cache
    }

    /// Register the XML resource text for a key without parsing it yet.
    pub fn register(&self, key: SchemaKey, xml: &'static str) {
        self.resources.write().insert(key, xml);
    }

    /// Fetch a schema, loading and validating its resource on first access.
    pub fn get(&self, key: &SchemaKey) -> FmtResult<Arc<RecordSchema>> {
        if let Some(schema) = self.loaded.read().get(key) {
            return Ok(schema.clone());
        }

        let xml = *self.resources.read().get(key).ok_or_else(|| {
            FormatError::Schema(format!(
                "no schema resource registered for {}/{}",
                key.mission, key.record_type
            ))
        })?;

        let schema = Arc::new(RecordSchema::from_xml(xml)?);
        log::debug!(
            "loaded record schema {}/{} ({} fields, {} bytes)",
            key.mission,
            key.record_type,
            schema.fields.len(),
            schema.record_length
        );

        let mut loaded = self.loaded.write();
        // Another thread may have populated the key while we parsed.
        Ok(loaded.entry(key.clone()).or_insert(schema).clone())
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::with_builtin_resources()
    }
}
