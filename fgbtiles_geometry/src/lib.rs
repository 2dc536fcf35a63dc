//! Geometry handling for the fgbtiles workspace.
//!
//! It includes modules for:
//! - `geo`: typed property values, property maps and the flat-coordinate
//!   feature representation produced by the FlatGeobuf decoder.
//! - `pipeline`: the per-feature tiling stages — project, clip, simplify,
//!   transform, wind — and the assembly of finished vector tile layers.
//! - `vector_tile`: reading and writing Mapbox Vector Tile (MVT) protobuf
//!   data, including the integer command-stream encoding.

pub mod geo;
pub mod pipeline;
pub mod vector_tile;
