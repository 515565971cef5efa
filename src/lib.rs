//! satfmt: decoding and geolocation for legacy satellite product formats
//!
//! This library reads ground-segment raster and orbit products — ENVI
//! flat-binary rasters, CEOS/ERS record files, DIMAP metadata documents,
//! DORIS ODR and PRARE PRC precise orbits — into a common product model
//! with tie-point geocoding, WGS84 geodesy, and orbit interpolation.

pub mod core;
pub mod io;
pub mod product;
pub mod types;

// Re-export main types
pub use product::{BandInfo, GeoCoding, MetadataElement, MetadataValue, Product};
pub use types::{
    DataType, DecodeQualification, Degradation, FmtResult, FormatError, GeoPos, Interleave,
    OrbitVector, PixelPos, SampleByteOrder,
};
