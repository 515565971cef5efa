//! Metadata abstraction: normalizes per-format fields into a fixed,
//! cross-format attribute vocabulary consumed by downstream processing.
//!
//! Every abstracted attribute pre-exists as a placeholder carrying a
//! "no data" sentinel. Setting an attribute that was never declared is a
//! mapping bug in a format reader; it is recorded as a degradation event
//! and logged, not thrown, so partially implemented format mappings stay
//! usable during incremental development.

use crate::product::{MetadataElement, MetadataValue, Product};
use crate::types::{Degradation, FmtResult, FormatError};
use chrono::{DateTime, TimeZone, Utc};

/// Root element name of the abstracted metadata tree.
pub const ABSTRACTED_ROOT: &str = "Abstracted_Metadata";

/// Sentinel for "no data" numeric attributes.
pub const NO_DATA_VALUE: f64 = 99999.0;
/// Sentinel for "no data" string attributes.
pub const NO_DATA_STRING: &str = "-";

/// The fixed cross-format attribute vocabulary.
pub const STRING_ATTRIBUTES: &[&str] = &[
    "PRODUCT",
    "PRODUCT_TYPE",
    "MISSION",
    "SENSOR",
    "PASS",
    "SCENE_ID",
    "PROCESSING_FACILITY",
    "wavelength_unit",
];

pub const INT_ATTRIBUTES: &[&str] = &[
    "ABS_ORBIT",
    "num_samples_per_line",
    "num_output_lines",
    "num_bands",
];

pub const DOUBLE_ATTRIBUTES: &[&str] = &[
    "centre_lat",
    "centre_lon",
    "centre_heading",
    "radar_frequency",
    "radar_wavelength",
    "pulse_repetition_frequency",
    "range_sampling_rate",
    "range_spacing",
    "azimuth_spacing",
    "slant_range_to_first_pixel",
    "incidence_near",
    "incidence_far",
    "incidence_angle_const_term",
    "incidence_angle_linear_term",
    "incidence_angle_quadratic_term",
];

pub const UTC_ATTRIBUTES: &[&str] = &["first_line_time", "last_line_time", "PROC_TIME"];

/// Writer that accumulates abstracted attributes and degradation events.
pub struct AbstractedMetadata {
    element: MetadataElement,
    degradations: Vec<Degradation>,
}

impl AbstractedMetadata {
    /// Create the writer with every vocabulary attribute declared as a
    /// no-data placeholder.
    pub fn new() -> Self {
        let mut element = MetadataElement::new(ABSTRACTED_ROOT);
        for name in STRING_ATTRIBUTES {
            element.set_attribute(name, MetadataValue::Str(NO_DATA_STRING.to_string()));
        }
        for name in INT_ATTRIBUTES {
            element.set_attribute(name, MetadataValue::Int(NO_DATA_VALUE as i64));
        }
        for name in DOUBLE_ATTRIBUTES {
            element.set_attribute(name, MetadataValue::Double(NO_DATA_VALUE));
        }
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        for name in UTC_ATTRIBUTES {
            element.set_attribute(name, MetadataValue::Utc(epoch));
        }
        Self {
            element,
            degradations: Vec::new(),
        }
    }

    fn set(&mut self, name: &str, value: MetadataValue) {
        if !self.element.has_attribute(name) {
            log::warn!("abstracted attribute '{}' was never declared; skipped", name);
            self.degradations.push(Degradation::UnmappedAttribute {
                name: name.to_string(),
            });
            return;
        }
        self.element.set_attribute(name, value);
    }

    pub fn set_string(&mut self, name: &str, value: &str) {
        self.set(name, MetadataValue::Str(value.to_string()));
    }

    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, MetadataValue::Int(value));
    }

    pub fn set_double(&mut self, name: &str, value: f64) {
        self.set(name, MetadataValue::Double(value));
    }

    pub fn set_utc(&mut self, name: &str, value: DateTime<Utc>) {
        self.set(name, MetadataValue::Utc(value));
    }

    pub fn get_string(&self, name: &str) -> FmtResult<String> {
        self.element
            .get_attribute(name)
            .map(MetadataValue::as_string)
            .ok_or_else(|| FormatError::UnknownField {
                record: ABSTRACTED_ROOT.to_string(),
                field: name.to_string(),
            })
    }

    pub fn get_double(&self, name: &str) -> FmtResult<f64> {
        match self.element.get_attribute(name) {
            Some(MetadataValue::Double(v)) => Ok(*v),
            Some(MetadataValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(FormatError::Schema(format!(
                "abstracted attribute '{}' holds {:?}, not a number",
                name, other
            ))),
            None => Err(FormatError::UnknownField {
                record: ABSTRACTED_ROOT.to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Degradation events recorded so far (unmapped attributes).
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    pub fn element(&self) -> &MetadataElement {
        &self.element
    }

    /// Attach the abstracted tree to a product's metadata root.
    pub fn attach_to(self, product: &mut Product) -> Vec<Degradation> {
        product.metadata_root_mut().add_child(self.element);
        self.degradations
    }
}

impl Default for AbstractedMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_declared() {
        let meta = AbstractedMetadata::new();
        assert_eq!(meta.get_string("MISSION").unwrap(), NO_DATA_STRING);
        assert_eq!(meta.get_double("incidence_near").unwrap(), NO_DATA_VALUE);
    }

    #[test]
    fn test_set_declared_attribute() {
        let mut meta = AbstractedMetadata::new();
        meta.set_string("MISSION", "ERS-2");
        meta.set_double("range_spacing", 12.5);
        assert_eq!(meta.get_string("MISSION").unwrap(), "ERS-2");
        assert_eq!(meta.get_double("range_spacing").unwrap(), 12.5);
        assert!(meta.degradations().is_empty());
    }

    #[test]
    fn test_undeclared_attribute_is_degradation_not_error() {
        let mut meta = AbstractedMetadata::new();
        meta.set_double("no_such_attribute", 1.0);
        assert_eq!(
            meta.degradations(),
            &[Degradation::UnmappedAttribute {
                name: "no_such_attribute".to_string()
            }]
        );
        // The tree itself is untouched.
        assert!(meta.element().get_attribute("no_such_attribute").is_none());
    }

    #[test]
    fn test_attach_to_product() {
        let mut meta = AbstractedMetadata::new();
        meta.set_string("PRODUCT", "SCENE1");
        let mut product = crate::product::Product::new("SCENE1", 10, 10);
        let degradations = meta.attach_to(&mut product);
        assert!(degradations.is_empty());
        let root = product.metadata_root().child(ABSTRACTED_ROOT).unwrap();
        assert_eq!(
            root.get_attribute("PRODUCT"),
            Some(&MetadataValue::Str("SCENE1".to_string()))
        );
    }
}
