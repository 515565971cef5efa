use crate::types::{FmtResult, FormatError};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Field encoding within a fixed-format record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Big-endian signed binary integer (1/2/4/8 bytes).
    BinaryInt,
    /// Big-endian unsigned binary integer (1/2/4/8 bytes).
    BinaryUint,
    /// Big-endian IEEE float (4/8 bytes).
    BinaryFloat,
    /// Fixed-width ASCII integer numeral.
    AsciiInt,
    /// Fixed-width ASCII float numeral.
    AsciiFloat,
    /// Fixed-width ASCII string.
    AsciiString,
    /// Fixed-width ASCII UTC timestamp (`yyyyMMddHHmmss` plus optional
    /// fractional seconds). Blank fields hold the epoch-0 sentinel.
    AsciiUtc,
    /// Reserved bytes, skipped but position-accounted.
    Skip,
}

/// One field of a record layout.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub width: usize,
    pub kind: FieldKind,
}

/// Ordered record layout for one record type of one mission format.
///
/// Loaded once from an XML definition resource and shared read-only
/// across every record instance of that type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: String,
    pub record_length: u64,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "recordSchema")]
struct SchemaDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@length")]
    length: u64,
    #[serde(rename = "field", default)]
    fields: Vec<FieldDoc>,
}

#[derive(Debug, Deserialize)]
struct FieldDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@width")]
    width: usize,
    #[serde(rename = "@type")]
    kind: String,
}

fn parse_kind(tag: &str, field: &str) -> FmtResult<FieldKind> {
    match tag {
        "B" => Ok(FieldKind::BinaryInt),
        "UB" => Ok(FieldKind::BinaryUint),
        "E" => Ok(FieldKind::BinaryFloat),
        "I" => Ok(FieldKind::AsciiInt),
        "F" => Ok(FieldKind::AsciiFloat),
        "A" => Ok(FieldKind::AsciiString),
        "T" => Ok(FieldKind::AsciiUtc),
        "X" => Ok(FieldKind::Skip),
        other => Err(FormatError::Schema(format!(
            "unknown field type '{}' on field '{}'",
            other, field
        ))),
    }
}

impl RecordSchema {
    /// Parse a schema definition from its XML resource text and validate
    /// the width accounting. Violated layouts fail here, not mid-record.
    pub fn from_xml(xml: &str) -> FmtResult<RecordSchema> {
        let doc: SchemaDoc =
            from_str(xml).map_err(|e| FormatError::Xml(format!("schema resource: {}", e)))?;

        let mut fields = Vec::with_capacity(doc.fields.len());
        for f in &doc.fields {
            let kind = parse_kind(&f.kind, &f.name)?;
            match kind {
                FieldKind::BinaryInt | FieldKind::BinaryUint => {
                    if !matches!(f.width, 1 | 2 | 4 | 8) {
                        return Err(FormatError::Schema(format!(
                            "field '{}': binary integer width {} is not 1/2/4/8",
                            f.name, f.width
                        )));
                    }
                }
                FieldKind::BinaryFloat => {
                    if !matches!(f.width, 4 | 8) {
                        return Err(FormatError::Schema(format!(
                            "field '{}': binary float width {} is not 4/8",
                            f.name, f.width
                        )));
                    }
                }
                _ => {}
            }
            fields.push(SchemaField {
                name: f.name.clone(),
                width: f.width,
                kind,
            });
        }

        let total: u64 = fields.iter().map(|f| f.width as u64).sum();
        if total > doc.length {
            return Err(FormatError::Schema(format!(
                "schema '{}': field widths sum to {} but record length is {}",
                doc.name, total, doc.length
            )));
        }
        if total < doc.length {
            log::debug!(
                "schema '{}': {} reserved gap bytes after declared fields",
                doc.name,
                doc.length - total
            );
        }

        Ok(RecordSchema {
            name: doc.name,
            record_length: doc.length,
            fields,
        })
    }

    /// Position of a named field relative to the record start.
    pub fn field_offset(&self, name: &str) -> Option<u64> {
        let mut offset = 0u64;
        for f in &self.fields {
            if f.name == name {
                return Some(offset);
            }
            offset += f.width as u64;
        }
        None
    }
}
