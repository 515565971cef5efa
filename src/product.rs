use crate::types::{DataType, GeoPos};
use chrono::{DateTime, Utc};

/// Tagged metadata attribute value (ascii / int / double / UTC).
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Str(String),
    Int(i64),
    Double(f64),
    Utc(DateTime<Utc>),
}

impl MetadataValue {
    pub fn as_string(&self) -> String {
        match self {
            MetadataValue::Str(s) => s.clone(),
            MetadataValue::Int(v) => v.to_string(),
            MetadataValue::Double(v) => v.to_string(),
            MetadataValue::Utc(t) => t.to_rfc3339(),
        }
    }
}

/// A named element in the metadata tree: ordered attributes plus children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataElement {
    pub name: String,
    attributes: Vec<(String, MetadataValue)>,
    children: Vec<MetadataElement>,
}

impl MetadataElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing any previous value under the same name.
    pub fn set_attribute(&mut self, name: &str, value: MetadataValue) {
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name.to_string(), value));
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&MetadataValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn add_child(&mut self, child: MetadataElement) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&MetadataElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children(&self) -> &[MetadataElement] {
        &self.children
    }
}

/// Band descriptor handed to the product by a header parser.
#[derive(Debug, Clone, PartialEq)]
pub struct BandInfo {
    pub name: String,
    /// Original (unsanitized) name or other free text; never lost.
    pub description: Option<String>,
    pub unit: String,
    pub data_type: DataType,
    pub width: usize,
    pub height: usize,
}

/// Map-projection description taken from a header's map-info section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    pub projection_name: String,
    pub reference_pixel_x: f64,
    pub reference_pixel_y: f64,
    pub easting: f64,
    pub northing: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    pub datum: String,
}

/// Geocoding attached to a product: either map-projection based or
/// tie-point-grid based (coarse lat/lon grids, bilinearly interpolated).
#[derive(Debug, Clone)]
pub enum GeoCoding {
    MapProjection(MapProjection),
    TiePoints {
        lat: crate::core::tiepoint::TiePointGrid,
        lon: crate::core::tiepoint::TiePointGrid,
    },
}

impl GeoCoding {
    /// Geodetic position of a pixel, where the geocoding can provide one.
    pub fn geo_pos(&self, x: f64, y: f64) -> GeoPos {
        match self {
            GeoCoding::MapProjection(mp) => GeoPos::new(
                mp.northing - (y - mp.reference_pixel_y + 0.5) * mp.pixel_size_y,
                mp.easting + (x - mp.reference_pixel_x + 0.5) * mp.pixel_size_x,
            ),
            GeoCoding::TiePoints { lat, lon } => {
                GeoPos::new(lat.value_at(x, y), lon.value_at(x, y))
            }
        }
    }
}

/// Target product populated by the header parsers.
///
/// Parsers only ever hand back a fully initialized product; any format
/// error during header parsing aborts before construction.
#[derive(Debug, Clone)]
pub struct Product {
    pub name: String,
    pub width: usize,
    pub height: usize,
    bands: Vec<BandInfo>,
    geocoding: Option<GeoCoding>,
    metadata_root: MetadataElement,
}

impl Product {
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            bands: Vec::new(),
            geocoding: None,
            metadata_root: MetadataElement::new("metadata"),
        }
    }

    pub fn add_band(&mut self, band: BandInfo) {
        self.bands.push(band);
    }

    pub fn bands(&self) -> &[BandInfo] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> Option<&BandInfo> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn set_geocoding(&mut self, geocoding: GeoCoding) {
        self.geocoding = Some(geocoding);
    }

    pub fn geocoding(&self) -> Option<&GeoCoding> {
        self.geocoding.as_ref()
    }

    pub fn metadata_root(&self) -> &MetadataElement {
        &self.metadata_root
    }

    pub fn metadata_root_mut(&mut self) -> &mut MetadataElement {
        &mut self.metadata_root
    }
}
