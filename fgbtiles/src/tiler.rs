//! The stateful entry point: owned readers plus shared caches.

use crate::caches::{HeaderCache, TileBoundsCache};
use crate::options::TileOptionsOverride;
use crate::source::TileSource;
use crate::tile::{SourceGroup, process_tile};
use fgbtiles_core::{Blob, TileCoord3, io::DataReader};
use anyhow::Result;

struct OwnedGroup {
	reader: DataReader,
	sources: Vec<TileSource>,
}

/// A tile server facade that owns its readers and keeps header and tile
/// bounds caches across requests.
pub struct Tiler {
	groups: Vec<OwnedGroup>,
	defaults: TileOptionsOverride,
	header_cache: HeaderCache,
	bounds_cache: TileBoundsCache,
}

impl Tiler {
	#[must_use]
	pub fn new() -> Tiler {
		Tiler::with_defaults(TileOptionsOverride::default())
	}

	#[must_use]
	pub fn with_defaults(defaults: TileOptionsOverride) -> Tiler {
		Tiler {
			groups: Vec::new(),
			defaults,
			header_cache: HeaderCache::new(),
			bounds_cache: TileBoundsCache::new(),
		}
	}

	/// Registers a reader with the sources served from it.
	pub fn add_reader(&mut self, reader: DataReader, sources: Vec<TileSource>) {
		self.groups.push(OwnedGroup { reader, sources });
	}

	/// Materializes the tile `(z, x, y)`.
	pub async fn get_tile(&self, z: u8, x: u32, y: u32) -> Result<Blob> {
		let coord = TileCoord3::new(z, x, y)?;
		let groups: Vec<SourceGroup<'_>> = self
			.groups
			.iter()
			.map(|group| SourceGroup {
				reader: group.reader.as_ref(),
				sources: &group.sources,
			})
			.collect();
		process_tile(
			&groups,
			&coord,
			&self.defaults,
			Some(&self.header_cache),
			&self.bounds_cache,
		)
		.await
	}
}

impl Default for Tiler {
	fn default() -> Self {
		Self::new()
	}
}
