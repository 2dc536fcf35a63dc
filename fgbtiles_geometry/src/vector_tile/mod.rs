//! Reading and writing Mapbox Vector Tile (MVT 2.1) protobuf data.
//!
//! The write path encodes pipeline output (integer tile coordinates and
//! interned tags) into per-layer protobuf messages; the read path decodes
//! complete tiles and is used for property updates and round-trip tests.

mod feature;
mod geometry_type;
mod layer;
mod property_manager;
mod tile;
mod value;

pub use feature::VectorTileFeature;
pub use geometry_type::GeomType;
pub use layer::VectorTileLayer;
pub use property_manager::{DedupTable, PropertyManager};
pub use tile::VectorTile;
pub use value::GeoValuePBF;
