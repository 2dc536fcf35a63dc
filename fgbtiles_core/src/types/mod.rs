//! Shared value types: byte buffers, byte ranges, bounding boxes, tile
//! coordinates and the size-bounded cache.

mod blob;
mod byte_range;
mod geo_bbox;
mod limited_cache;
mod tile_coord;

pub use blob::Blob;
pub use byte_range::ByteRange;
pub use geo_bbox::GeoBBox;
pub use limited_cache::LimitedCache;
pub use tile_coord::TileCoord3;
