//! Feature-level data: geometry kinds, typed property values, property maps
//! and the flat-coordinate raw feature produced by the FlatGeobuf decoder.

mod feature;
mod geometry_kind;
mod properties;
mod value;

pub use feature::RawFeature;
pub use geometry_kind::GeometryKind;
pub use properties::GeoProperties;
pub use value::GeoValue;
