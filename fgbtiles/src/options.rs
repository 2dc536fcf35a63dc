//! Tile generation options and their resolution order.
//!
//! Any option resolves as: per-source override, then tile-level default,
//! then built-in default.

/// Fully resolved options for one source in one tile request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileOptions {
	/// Integer tile grid per axis.
	pub extent: u32,
	/// Extra tile pixels of clip overshoot on every side.
	pub buffer: u32,
	/// Simplification tolerance in tile pixels; `0` disables.
	pub tolerance: f64,
	/// Inclusive zoom bounds; requests outside skip all I/O.
	pub min_zoom: u8,
	pub max_zoom: u8,
}

impl Default for TileOptions {
	fn default() -> Self {
		TileOptions {
			extent: 4096,
			buffer: 64,
			tolerance: 3.0,
			min_zoom: 0,
			max_zoom: 24,
		}
	}
}

/// A sparse option set; unset fields fall through to the next level.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TileOptionsOverride {
	pub extent: Option<u32>,
	pub buffer: Option<u32>,
	pub tolerance: Option<f64>,
	pub min_zoom: Option<u8>,
	pub max_zoom: Option<u8>,
}

impl TileOptionsOverride {
	/// Applies the set fields of `self` on top of `base`.
	#[must_use]
	pub fn apply_to(&self, base: TileOptions) -> TileOptions {
		TileOptions {
			extent: self.extent.unwrap_or(base.extent),
			buffer: self.buffer.unwrap_or(base.buffer),
			tolerance: self.tolerance.unwrap_or(base.tolerance),
			min_zoom: self.min_zoom.unwrap_or(base.min_zoom),
			max_zoom: self.max_zoom.unwrap_or(base.max_zoom),
		}
	}

	/// Resolves source override over tile default over built-in default.
	#[must_use]
	pub fn resolve(tile_defaults: &TileOptionsOverride, source: &TileOptionsOverride) -> TileOptions {
		source.apply_to(tile_defaults.apply_to(TileOptions::default()))
	}
}
