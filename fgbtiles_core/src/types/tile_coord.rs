//! This module defines [`TileCoord3`], a slippy-map tile address `(z, x, y)`
//! with `y = 0` at the north edge, and its conversions into the WGS84 and
//! Mercator-unit bounding boxes the tiling pipeline works with.

use crate::GeoBBox;
use anyhow::{Result, ensure};
use std::f64::consts::PI;
use std::fmt::{self, Debug};

#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord3 {
	pub x: u32,
	pub y: u32,
	pub z: u8,
}

impl TileCoord3 {
	pub fn new(z: u8, x: u32, y: u32) -> Result<TileCoord3> {
		ensure!(z <= 30, "zoom level ({z}) must be <= 30");
		let max = 1u32 << z;
		ensure!(x < max, "x ({x}) must be < 2^z ({max})");
		ensure!(y < max, "y ({y}) must be < 2^z ({max})");
		Ok(TileCoord3 { x, y, z })
	}

	/// A single integer identifying this tile across all zoom levels.
	///
	/// Injective for all valid coordinates: row-major position within the
	/// level, shifted to leave 5 bits for the zoom.
	#[must_use]
	pub fn tile_id(&self) -> u64 {
		let size = 1u64 << self.z;
		((size * u64::from(self.y) + u64::from(self.x)) * 32) + u64::from(self.z)
	}

	/// The WGS84 bounding box of this tile (no buffer).
	#[must_use]
	pub fn as_wgs84_bbox(&self) -> GeoBBox {
		let zoom = f64::from(1u32 << self.z);
		let lng = |x: f64| (x / zoom - 0.5) * 360.0;
		let lat = |y: f64| ((PI * (1.0 - 2.0 * y / zoom)).exp().atan() / PI - 0.25) * 360.0;

		GeoBBox {
			x_min: lng(f64::from(self.x)),
			y_min: lat(f64::from(self.y + 1)),
			x_max: lng(f64::from(self.x + 1)),
			y_max: lat(f64::from(self.y)),
		}
	}

	/// The Mercator-unit clip box of this tile, widened by `buffer` tile
	/// pixels of the given `extent` on every side.
	///
	/// Both axes run in `[0, 1]` with y = 0 at the north edge; the buffer
	/// margin may push the box slightly outside that interval.
	#[must_use]
	pub fn as_mercator_bbox(&self, buffer: u32, extent: u32) -> GeoBBox {
		let zoom = f64::from(1u32 << self.z);
		let margin = f64::from(buffer) / f64::from(extent);

		GeoBBox {
			x_min: (f64::from(self.x) - margin) / zoom,
			y_min: (f64::from(self.y) - margin) / zoom,
			x_max: (f64::from(self.x + 1) + margin) / zoom,
			y_max: (f64::from(self.y + 1) + margin) / zoom,
		}
	}
}

impl Debug for TileCoord3 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("TileCoord3({}, [{}, {}])", &self.z, &self.x, &self.y))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn new_validates() {
		assert!(TileCoord3::new(5, 31, 0).is_ok());
		assert!(TileCoord3::new(5, 32, 0).is_err());
		assert!(TileCoord3::new(31, 0, 0).is_err());
	}

	#[test]
	fn tile_id_is_injective_up_to_z5() {
		let mut seen = HashSet::new();
		for z in 0u8..=5 {
			for y in 0..(1u32 << z) {
				for x in 0..(1u32 << z) {
					assert!(seen.insert(TileCoord3::new(z, x, y).unwrap().tile_id()));
				}
			}
		}
		assert_eq!(seen.len(), 1365);
	}

	#[test]
	fn wgs84_bbox_of_root_tile() {
		let bbox = TileCoord3::new(0, 0, 0).unwrap().as_wgs84_bbox();
		assert!((bbox.x_min + 180.0).abs() < 1e-9);
		assert!((bbox.x_max - 180.0).abs() < 1e-9);
		assert!((bbox.y_max - 85.05112877980659).abs() < 1e-9);
		assert!((bbox.y_min + 85.05112877980659).abs() < 1e-9);
	}

	#[test]
	fn wgs84_bbox_center_tile() {
		// Tile (5, 16, 16) has its top-left corner at exactly (0°, 0°).
		let bbox = TileCoord3::new(5, 16, 16).unwrap().as_wgs84_bbox();
		assert!((bbox.x_min).abs() < 1e-9);
		assert!((bbox.y_max).abs() < 1e-9);
		assert!(bbox.x_max > 0.0 && bbox.y_min < 0.0);
	}

	#[test]
	fn mercator_bbox_with_buffer() {
		let bbox = TileCoord3::new(1, 1, 0).unwrap().as_mercator_bbox(64, 4096);
		let margin = 64.0 / 4096.0 / 2.0;
		assert!((bbox.x_min - (0.5 - margin)).abs() < 1e-12);
		assert!((bbox.x_max - (1.0 + margin)).abs() < 1e-12);
		assert!((bbox.y_min - (0.0 - margin)).abs() < 1e-12);
		assert!((bbox.y_max - (0.5 + margin)).abs() < 1e-12);
	}
}
