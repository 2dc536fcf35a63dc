//! Multi-source tile assembly.
//!
//! The WGS84 query box is computed once per tile; the Mercator clip box
//! once per `(buffer, extent)` combination. All sources across all reader
//! groups run concurrently, and the output layers appear in
//! source-array-then-group order.

use crate::caches::{HeaderCache, TileBoundsCache};
use crate::options::TileOptionsOverride;
use crate::source::{TileSource, process_source};
use fgbtiles_core::{Blob, TileCoord3, io::DataReaderTrait};
use fgbtiles_geometry::vector_tile::VectorTile;
use anyhow::{Context, Result};
use futures::future::try_join_all;

/// A byte-range reader with the sources served from it.
pub struct SourceGroup<'a> {
	pub reader: &'a dyn DataReaderTrait,
	pub sources: &'a [TileSource],
}

/// Materializes one complete tile across all reader groups.
///
/// The first failing source fails the request; no partial tiles are
/// synthesized. An empty source list produces a zero-length payload.
pub async fn process_tile(
	groups: &[SourceGroup<'_>],
	coord: &TileCoord3,
	tile_defaults: &TileOptionsOverride,
	header_cache: Option<&HeaderCache>,
	bounds_cache: &TileBoundsCache,
) -> Result<Blob> {
	let query_bbox = bounds_cache.wgs84_bbox(coord);

	let mut pending = Vec::new();
	for group in groups {
		for source in group.sources {
			let options = TileOptionsOverride::resolve(tile_defaults, &source.options);
			let clip_bbox = bounds_cache.clip_bbox(coord, options.buffer, options.extent);
			pending.push(async move {
				process_source(group.reader, source, coord, &query_bbox, &clip_bbox, &options, header_cache)
					.await
					.with_context(|| format!("while processing source '{}'", source.name))
			});
		}
	}

	let layers = try_join_all(pending).await?;
	VectorTile::new(layers).to_blob().context("failed to encode tile")
}
