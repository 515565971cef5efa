//! I/O modules: binary primitives, schema-driven records, and the format
//! readers (ENVI, CEOS, DIMAP, DORIS ODR, PRARE PRC) with band data access.

pub mod band;
pub mod binary;
pub mod ceos;
pub mod dimap;
pub mod doris;
pub mod envi;
pub mod prare;
pub mod record;
pub mod schema;

pub use band::{BandLayout, BandRowReader, CancelToken};
pub use binary::BinaryReader;
pub use ceos::{CeosLeader, CeosRecordSet};
pub use doris::OdrFile;
pub use envi::EnviHeader;
pub use prare::PrcFile;
pub use record::{parse_ascii_utc, BinaryRecord, FieldValue, SchemaCache, SchemaKey};
pub use schema::RecordSchema;

use crate::types::DecodeQualification;

/// Formats this crate can identify from a small leading byte sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownFormat {
    Envi,
    Ceos,
    DorisOdr,
    PrarePrc,
    Dimap,
}

impl KnownFormat {
    /// Cheap peek-only probe against the leading bytes of a file. Never
    /// reads past what the caller supplies.
    pub fn qualification(&self, head: &[u8]) -> DecodeQualification {
        match self {
            KnownFormat::Envi => match std::str::from_utf8(head) {
                Ok(text) => envi::qualification(text),
                Err(_) => DecodeQualification::Unable,
            },
            KnownFormat::Ceos => ceos::qualification(head),
            KnownFormat::DorisOdr => doris::qualification(head),
            KnownFormat::PrarePrc => prare::qualification(head),
            KnownFormat::Dimap => {
                let text = String::from_utf8_lossy(head);
                if text.trim_start().starts_with("<?xml") && text.contains("<Dimap_Document") {
                    DecodeQualification::Intended
                } else {
                    DecodeQualification::Unable
                }
            }
        }
    }

    const ALL: [KnownFormat; 5] = [
        KnownFormat::Envi,
        KnownFormat::Ceos,
        KnownFormat::DorisOdr,
        KnownFormat::PrarePrc,
        KnownFormat::Dimap,
    ];
}

/// Pick the reader for a byte sample: the format whose probe reports the
/// highest qualification, `Intended` beating `Suitable`. Returns `None`
/// when every probe reports `Unable`.
pub fn detect_format(head: &[u8]) -> Option<KnownFormat> {
    let mut best: Option<(DecodeQualification, KnownFormat)> = None;
    for format in KnownFormat::ALL {
        let q = format.qualification(head);
        if q == DecodeQualification::Unable {
            continue;
        }
        log::debug!("format probe: {:?} -> {:?}", format, q);
        match best {
            Some((best_q, _)) if best_q >= q => {}
            _ => best = Some((q, format)),
        }
    }
    best.map(|(_, format)| format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_odr() {
        let mut head = b"xODR".to_vec();
        head.extend_from_slice(&[0u8; 16]);
        assert_eq!(detect_format(&head), Some(KnownFormat::DorisOdr));
    }

    #[test]
    fn test_detect_prc() {
        assert_eq!(
            detect_format(b"PRC100 ERS2 D-PAF   "),
            Some(KnownFormat::PrarePrc)
        );
    }

    #[test]
    fn test_detect_envi() {
        assert_eq!(
            detect_format(b"ENVI\nsamples = 100\n"),
            Some(KnownFormat::Envi)
        );
    }

    #[test]
    fn test_detect_dimap() {
        let head = b"<?xml version=\"1.0\"?>\n<Dimap_Document>";
        assert_eq!(detect_format(head), Some(KnownFormat::Dimap));
    }

    #[test]
    fn test_detect_nothing() {
        assert_eq!(detect_format(b"random bytes here none"), None);
    }
}
