//! FlatGeobuf format support for the fgbtiles workspace.
//!
//! It includes modules for:
//! - `flatbuffer`: a read-only, bounds-checked decoder for the FlatBuffers
//!   wire format.
//! - `header`: file prologue validation, header table decoding and the
//!   derived index/feature byte offsets.
//! - `index`: the packed Hilbert R-tree query producing sorted, merged byte
//!   ranges for a bounding box.
//! - `feature`: decoding of length-prefixed feature records into the
//!   workspace's raw feature representation.
//!
//! The `fixtures` module (behind the `test` feature) builds small
//! FlatGeobuf files in memory for the test suites; it is not a general
//! writing API.

pub mod feature;
pub mod flatbuffer;
pub mod header;
pub mod index;

#[cfg(any(test, feature = "test"))]
pub mod fixtures;

pub use feature::decode_features;
pub use flatbuffer::FlatBufferSlice;
pub use header::{Column, ColumnType, Header};
pub use index::query_index;
