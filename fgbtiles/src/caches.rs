//! Shared caches: parsed headers with their index bytes, and derived tile
//! bounds.
//!
//! Both caches are append-only from the caller's perspective: entries are
//! immutable once inserted, readers may race to initialize, and a duplicate
//! computation is harmless. The header cache is additionally size-bounded.

use fgbtiles_core::{Blob, GeoBBox, LimitedCache, TileCoord3};
use fgbtiles_flatgeobuf::Header;
use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

/// Approximate byte budget for cached header entries.
const HEADER_CACHE_SIZE: usize = 512 * 1024;

/// A parsed header together with the raw index bytes, immutable after
/// creation.
#[derive(Clone, Debug)]
pub struct HeaderEntry {
	pub header: Header,
	pub index: Blob,
}

/// Header cache keyed by source name.
#[derive(Debug)]
pub struct HeaderCache {
	inner: Mutex<LimitedCache<String, Arc<HeaderEntry>>>,
}

impl HeaderCache {
	#[must_use]
	pub fn new() -> HeaderCache {
		HeaderCache {
			inner: Mutex::new(LimitedCache::with_maximum_size(HEADER_CACHE_SIZE)),
		}
	}

	pub fn get(&self, name: &str) -> Option<Arc<HeaderEntry>> {
		self.inner.lock().unwrap().get(&name.to_string())
	}

	pub fn insert(&self, name: &str, entry: Arc<HeaderEntry>) -> Arc<HeaderEntry> {
		self.inner.lock().unwrap().add(name.to_string(), entry)
	}
}

impl Default for HeaderCache {
	fn default() -> Self {
		Self::new()
	}
}

/// Derived tile bounds, cached per tile id and per `(tile id, buffer,
/// extent)`.
#[derive(Debug, Default)]
pub struct TileBoundsCache {
	wgs84: Mutex<HashMap<u64, GeoBBox>>,
	clip: Mutex<HashMap<(u64, u32, u32), GeoBBox>>,
}

impl TileBoundsCache {
	#[must_use]
	pub fn new() -> TileBoundsCache {
		TileBoundsCache::default()
	}

	/// The WGS84 bounding box of a tile, used for index queries.
	pub fn wgs84_bbox(&self, coord: &TileCoord3) -> GeoBBox {
		let mut cache = self.wgs84.lock().unwrap();
		*cache
			.entry(coord.tile_id())
			.or_insert_with(|| coord.as_wgs84_bbox())
	}

	/// The Mercator-unit clip box of a tile for the given buffer and
	/// extent.
	pub fn clip_bbox(&self, coord: &TileCoord3, buffer: u32, extent: u32) -> GeoBBox {
		let mut cache = self.clip.lock().unwrap();
		*cache
			.entry((coord.tile_id(), buffer, extent))
			.or_insert_with(|| coord.as_mercator_bbox(buffer, extent))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bounds_are_cached_and_stable() {
		let cache = TileBoundsCache::new();
		let coord = TileCoord3::new(5, 17, 10).unwrap();
		let first = cache.wgs84_bbox(&coord);
		let second = cache.wgs84_bbox(&coord);
		assert_eq!(first, second);
		assert_eq!(first, coord.as_wgs84_bbox());
	}

	#[test]
	fn clip_bbox_is_keyed_by_buffer_and_extent() {
		let cache = TileBoundsCache::new();
		let coord = TileCoord3::new(5, 17, 10).unwrap();
		let narrow = cache.clip_bbox(&coord, 0, 4096);
		let wide = cache.clip_bbox(&coord, 256, 4096);
		assert!(wide.x_min < narrow.x_min);
		assert_eq!(cache.clip_bbox(&coord, 0, 4096), narrow);
	}

	#[test]
	fn header_cache_round_trip() {
		use fgbtiles_flatgeobuf::fixtures::point_fgb;
		use fgbtiles_flatgeobuf::header::parse_header;

		let blob = point_fgb(&[(1.0, 2.0)]);
		let header = parse_header(blob.as_slice()).unwrap();
		let entry = Arc::new(HeaderEntry {
			header,
			index: Blob::new_empty(),
		});

		let cache = HeaderCache::new();
		assert!(cache.get("a.fgb").is_none());
		cache.insert("a.fgb", entry.clone());
		assert_eq!(cache.get("a.fgb").unwrap().header, entry.header);
	}
}
