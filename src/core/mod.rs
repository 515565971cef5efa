//! Core geolocation modules: geodesy, orbit interpolation, tie-point
//! grids, slant-range refinement, and the abstracted metadata layer.

pub mod geodesy;
pub mod interpolate;
pub mod metadata;
pub mod refine;
pub mod tiepoint;

// Re-export main types
pub use interpolate::{interpolate_cubic, lagrange_interpolate, OrbitVectors};
pub use metadata::AbstractedMetadata;
pub use refine::refine_target_position;
pub use tiepoint::TiePointGrid;
