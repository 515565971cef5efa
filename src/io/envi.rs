use crate::product::{BandInfo, GeoCoding, MapProjection, MetadataValue, Product};
use crate::types::{
    DataType, DecodeQualification, Degradation, FmtResult, FormatError, Interleave,
    SampleByteOrder,
};
use regex::Regex;
use std::collections::HashMap;

/// Parsed ENVI `.hdr` header: text `key = value` pairs with case-insensitive
/// keys and `{}`-wrapped list values that may span lines.
#[derive(Debug, Clone)]
pub struct EnviHeader {
    pub samples: usize,
    pub lines: usize,
    pub bands: usize,
    pub data_type: DataType,
    pub interleave: Interleave,
    pub byte_order: SampleByteOrder,
    pub header_offset: u64,
    pub description: Option<String>,
    pub band_names: Vec<String>,
    /// Original names for bands whose names had to be sanitized.
    pub band_descriptions: Vec<Option<String>>,
    pub wavelengths: Vec<f64>,
    pub wavelength_units: Option<String>,
    pub map_info: Option<MapProjection>,
    pub degradations: Vec<Degradation>,
}

/// Cheap decode probe: peeks at the head of the file only.
///
/// A leading `ENVI` magic token is an unambiguous claim; a header that
/// merely has the mandatory key shape is accepted as a fallback.
pub fn qualification(head: &str) -> DecodeQualification {
    let trimmed = head.trim_start();
    if trimmed.starts_with("ENVI") {
        return DecodeQualification::Intended;
    }
    let lower = head.to_ascii_lowercase();
    if lower.contains("samples") && lower.contains("lines") && lower.contains("bands") {
        return DecodeQualification::Suitable;
    }
    DecodeQualification::Unable
}

/// Deterministic fallback names for unnamed bands: a single band keeps the
/// legacy name `Band`; additional bands get `Band_2`, `Band_3`, ...
pub fn default_band_names(bands: usize) -> Vec<String> {
    (0..bands)
        .map(|i| {
            if i == 0 {
                "Band".to_string()
            } else {
                format!("Band_{}", i + 1)
            }
        })
        .collect()
}

/// Rewrite a band name into a valid identifier: invalid characters collapse
/// to a single underscore, leading/trailing separators are trimmed. Returns
/// the sanitized name and, when a rewrite happened, the original.
pub fn sanitize_band_name(name: &str) -> (String, Option<String>) {
    let invalid = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
    let sanitized = invalid.replace_all(name.trim(), "_");
    let sanitized = sanitized.trim_matches('_').to_string();
    let sanitized = if sanitized.is_empty() {
        "Band".to_string()
    } else {
        sanitized
    };
    if sanitized == name {
        (sanitized, None)
    } else {
        (sanitized, Some(name.to_string()))
    }
}

/// Infer a physical unit string from band-name heuristics.
pub fn unit_from_band_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.contains("phase") {
        "phase"
    } else if lower.contains("imag") || lower.ends_with("_q") || lower.starts_with("q_") {
        "imaginary"
    } else if lower.contains("real") || lower.ends_with("_i") || lower.starts_with("i_") {
        "real"
    } else if lower.contains("intensity") || lower.contains("sigma") {
        "intensity"
    } else {
        "amplitude"
    }
}

fn data_type_from_code(code: i64) -> FmtResult<DataType> {
    match code {
        1 => Ok(DataType::UInt8),
        2 => Ok(DataType::Int16),
        3 => Ok(DataType::Int32),
        4 => Ok(DataType::Float32),
        5 => Ok(DataType::Float64),
        12 => Ok(DataType::UInt16),
        13 => Ok(DataType::UInt32),
        14 => Ok(DataType::Int64),
        15 => Ok(DataType::UInt64),
        other => Err(FormatError::Header(format!(
            "unsupported ENVI data type code {}",
            other
        ))),
    }
}

/// Split header text into lowercase key -> raw value pairs. `{...}` list
/// values are joined across lines before splitting.
fn tokenize(text: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    let mut pending: Option<(String, String)> = None;

    for line in text.lines() {
        if let Some((key, mut value)) = pending.take() {
            value.push(' ');
            value.push_str(line.trim());
            if value.contains('}') {
                pairs.insert(key, value);
            } else {
                pending = Some((key, value));
            }
            continue;
        }

        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("ENVI") || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if value.starts_with('{') && !value.contains('}') {
                pending = Some((key, value));
            } else {
                pairs.insert(key, value);
            }
        }
    }
    if let Some((key, value)) = pending {
        // Unterminated list; keep what we have.
        pairs.insert(key, value);
    }
    pairs
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn mandatory_int(pairs: &HashMap<String, String>, key: &str) -> FmtResult<usize> {
    let raw = pairs
        .get(key)
        .ok_or_else(|| FormatError::Header(format!("missing mandatory ENVI key '{}'", key)))?;
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FormatError::Header(format!("ENVI key '{}' is not an integer: {:?}", key, raw)))?;
    if value <= 0 {
        return Err(FormatError::Header(format!(
            "ENVI key '{}' must be positive, got {}",
            key, value
        )));
    }
    Ok(value as usize)
}

impl EnviHeader {
    /// Parse an ENVI header from its full text. Missing mandatory keys are
    /// fatal; missing optional sections degrade to synthesized defaults.
    pub fn parse(text: &str) -> FmtResult<EnviHeader> {
        let pairs = tokenize(text);
        let mut degradations = Vec::new();

        let samples = mandatory_int(&pairs, "samples")?;
        let lines = mandatory_int(&pairs, "lines")?;
        let bands = mandatory_int(&pairs, "bands")?;

        let data_type_code: i64 = pairs
            .get("data type")
            .ok_or_else(|| FormatError::Header("missing mandatory ENVI key 'data type'".to_string()))?
            .trim()
            .parse()
            .map_err(|_| FormatError::Header("ENVI 'data type' is not an integer".to_string()))?;
        let data_type = data_type_from_code(data_type_code)?;

        let interleave = match pairs.get("interleave").map(|s| s.to_ascii_lowercase()) {
            Some(ref s) if s == "bil" => Interleave::Bil,
            Some(ref s) if s == "bip" => Interleave::Bip,
            _ => Interleave::Bsq,
        };

        let byte_order = match pairs.get("byte order").map(|s| s.trim()) {
            Some("1") => SampleByteOrder::BigEndian,
            _ => SampleByteOrder::LittleEndian,
        };

        let header_offset = pairs
            .get("header offset")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0);

        // Free text, not a list: braces off, commas kept.
        let description = pairs.get("description").map(|v| {
            v.trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .trim()
                .to_string()
        });

        // Optional band names; absence degrades to deterministic defaults.
        let (band_names, band_descriptions) = match pairs.get("band names") {
            Some(raw) => {
                let mut names = parse_list(raw);
                if names.len() != bands {
                    log::warn!(
                        "ENVI header declares {} bands but names {} of them; padding with defaults",
                        bands,
                        names.len()
                    );
                    let defaults = default_band_names(bands);
                    while names.len() < bands {
                        names.push(defaults[names.len()].clone());
                    }
                    names.truncate(bands);
                }
                let mut sanitized = Vec::with_capacity(bands);
                let mut descriptions = Vec::with_capacity(bands);
                for name in names {
                    let (clean, original) = sanitize_band_name(&name);
                    if let Some(ref orig) = original {
                        degradations.push(Degradation::SanitizedBandName {
                            original: orig.clone(),
                            sanitized: clean.clone(),
                        });
                    }
                    sanitized.push(clean);
                    descriptions.push(original);
                }
                (sanitized, descriptions)
            }
            None => {
                log::debug!("ENVI header has no 'band names'; synthesizing defaults");
                degradations.push(Degradation::MissingOptionalSection {
                    format: "ENVI".to_string(),
                    section: "band names".to_string(),
                });
                (default_band_names(bands), vec![None; bands])
            }
        };

        let wavelengths = pairs
            .get("wavelength")
            .map(|raw| {
                parse_list(raw)
                    .iter()
                    .filter_map(|s| s.parse::<f64>().ok())
                    .collect()
            })
            .unwrap_or_default();
        let wavelength_units = pairs.get("wavelength units").cloned();

        let map_info = match pairs.get("map info") {
            Some(raw) => parse_map_info(raw)?,
            None => {
                degradations.push(Degradation::MissingOptionalSection {
                    format: "ENVI".to_string(),
                    section: "map info".to_string(),
                });
                None
            }
        };

        Ok(EnviHeader {
            samples,
            lines,
            bands,
            data_type,
            interleave,
            byte_order,
            header_offset,
            description,
            band_names,
            band_descriptions,
            wavelengths,
            wavelength_units,
            map_info,
            degradations,
        })
    }

    /// Build a target product from this header: per-band descriptors with
    /// inferred units, geocoding when map info is present, and the raw
    /// header keys recorded under a metadata child element.
    pub fn to_product(&self, name: &str) -> Product {
        let mut product = Product::new(name, self.samples, self.lines);

        for (i, band_name) in self.band_names.iter().enumerate() {
            product.add_band(BandInfo {
                name: band_name.clone(),
                description: self.band_descriptions[i].clone(),
                unit: unit_from_band_name(band_name).to_string(),
                data_type: self.data_type,
                width: self.samples,
                height: self.lines,
            });
        }

        if let Some(ref mp) = self.map_info {
            product.set_geocoding(GeoCoding::MapProjection(mp.clone()));
        }

        let mut header_elem = crate::product::MetadataElement::new("ENVI_Header");
        header_elem.set_attribute("samples", MetadataValue::Int(self.samples as i64));
        header_elem.set_attribute("lines", MetadataValue::Int(self.lines as i64));
        header_elem.set_attribute("bands", MetadataValue::Int(self.bands as i64));
        if let Some(ref d) = self.description {
            header_elem.set_attribute("description", MetadataValue::Str(d.clone()));
        }
        if let Some(ref u) = self.wavelength_units {
            header_elem.set_attribute("wavelength_units", MetadataValue::Str(u.clone()));
        }
        product.metadata_root_mut().add_child(header_elem);

        product
    }
}

/// Parse an ENVI `map info` comma list. A malformed numeric entry in the
/// positional fields is fatal; extra trailing entries are ignored.
fn parse_map_info(raw: &str) -> FmtResult<Option<MapProjection>> {
    let parts = parse_list(raw);
    if parts.len() < 7 {
        return Err(FormatError::Header(format!(
            "ENVI 'map info' needs at least 7 entries, got {}",
            parts.len()
        )));
    }
    let num = |i: usize| -> FmtResult<f64> {
        parts[i].parse::<f64>().map_err(|_| {
            FormatError::Header(format!(
                "ENVI 'map info' entry {} is not numeric: {:?}",
                i, parts[i]
            ))
        })
    };
    Ok(Some(MapProjection {
        projection_name: parts[0].clone(),
        reference_pixel_x: num(1)?,
        reference_pixel_y: num(2)?,
        easting: num(3)?,
        northing: num(4)?,
        pixel_size_x: num(5)?,
        pixel_size_y: num(6)?,
        datum: parts.get(7).cloned().unwrap_or_default(),
    }))
}
