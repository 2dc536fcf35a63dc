//! Core building blocks for the fgbtiles workspace.
//!
//! This crate carries the format-agnostic plumbing used by every other
//! member of the workspace:
//! - `types`: byte buffers ([`Blob`]), byte ranges ([`ByteRange`]), geographic
//!   bounding boxes ([`GeoBBox`]), tile coordinates ([`TileCoord3`]) and a
//!   size-bounded LRU cache ([`LimitedCache`]).
//! - `io`: the asynchronous byte-range reader abstraction
//!   ([`io::DataReaderTrait`]) with file, HTTP and in-memory backends, and the
//!   endian-parameterized [`io::ValueReader`] / [`io::ValueWriter`] traits
//!   carrying the varint and Protocol Buffers primitives.

pub mod io;
pub mod types;

pub use types::{Blob, ByteRange, GeoBBox, LimitedCache, TileCoord3};
