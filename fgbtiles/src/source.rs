//! Per-source tile materialization: header reads, index query, feature
//! range reads, decode and the geometry pipeline.

use crate::caches::{HeaderCache, HeaderEntry};
use crate::options::TileOptions;
use fgbtiles_core::{Blob, ByteRange, GeoBBox, TileCoord3, io::DataReaderTrait};
use fgbtiles_flatgeobuf::{decode_features, header, query_index};
use fgbtiles_geometry::pipeline::{TileParams, build_layer};
use fgbtiles_geometry::vector_tile::VectorTileLayer;
use anyhow::{Context, Result};
use log::{debug, trace};
use std::sync::Arc;

use crate::options::TileOptionsOverride;

/// One FlatGeobuf source contributing a layer to tile requests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileSource {
	/// Layer name in the output tile.
	pub name: String,
	/// Per-source option overrides.
	pub options: TileOptionsOverride,
}

impl TileSource {
	pub fn new(name: &str) -> TileSource {
		TileSource {
			name: name.to_string(),
			options: TileOptionsOverride::default(),
		}
	}

	pub fn with_options(name: &str, options: TileOptionsOverride) -> TileSource {
		TileSource {
			name: name.to_string(),
			options,
		}
	}
}

/// Fetches (or reuses) the parsed header and index bytes of a source.
async fn obtain_header(reader: &dyn DataReaderTrait, cache: Option<&HeaderCache>) -> Result<Arc<HeaderEntry>> {
	if let Some(cache) = cache
		&& let Some(entry) = cache.get(reader.get_name())
	{
		trace!("header cache hit for '{}'", reader.get_name());
		return Ok(entry);
	}

	// two-phase header read: the fixed prologue sizes the full read
	let prologue = reader
		.read_range(&ByteRange::new(0, header::PROLOGUE_SIZE))
		.await
		.context("failed to read file prologue")?;
	let header_size = header::header_byte_size(prologue.as_slice())?;

	let header_bytes = if prologue.len() >= header_size {
		prologue
	} else {
		reader
			.read_range(&ByteRange::new(0, header_size))
			.await
			.context("failed to read file header")?
	};
	let parsed = header::parse_header(header_bytes.as_slice())?;

	let index = if parsed.index_size > 0 {
		reader
			.read_range(&ByteRange::new(parsed.index_offset, parsed.index_size))
			.await
			.context("failed to read spatial index")?
	} else {
		Blob::new_empty()
	};

	let entry = Arc::new(HeaderEntry { header: parsed, index });
	if let Some(cache) = cache {
		cache.insert(reader.get_name(), entry.clone());
	}
	Ok(entry)
}

/// Materializes one source's layer for one tile request.
///
/// Returns a well-formed empty layer (name and extent set, all lists
/// empty) when the request is out of the source's zoom range, the source
/// carries no index, or nothing intersects the tile.
pub async fn process_source(
	reader: &dyn DataReaderTrait,
	source: &TileSource,
	coord: &TileCoord3,
	query_bbox: &GeoBBox,
	clip_bbox: &GeoBBox,
	options: &TileOptions,
	header_cache: Option<&HeaderCache>,
) -> Result<VectorTileLayer> {
	let empty = || VectorTileLayer::new(source.name.clone(), options.extent);

	if coord.z < options.min_zoom || coord.z > options.max_zoom {
		trace!("tile {coord:?} outside zoom range of source '{}'", source.name);
		return Ok(empty());
	}

	let entry = obtain_header(reader, header_cache)
		.await
		.with_context(|| format!("while reading header of '{}'", reader.get_name()))?;
	let header = &entry.header;

	if header.index_node_size == 0 || header.features_count == 0 {
		debug!("source '{}' has no spatial index, returning empty layer", source.name);
		return Ok(empty());
	}

	let ranges = query_index(
		entry.index.as_slice(),
		query_bbox,
		header.features_count,
		header.index_node_size,
		header.features_offset,
	)
	.with_context(|| format!("while querying the index of '{}'", reader.get_name()))?;
	if ranges.is_empty() {
		return Ok(empty());
	}

	let chunks = reader
		.read_ranges(&ranges)
		.await
		.with_context(|| format!("while reading {} feature ranges of '{}'", ranges.len(), reader.get_name()))?;

	let mut features = Vec::new();
	for chunk in &chunks {
		features.extend(decode_features(chunk.as_slice(), header, None)?);
	}
	trace!(
		"source '{}': {} candidate features from {} ranges",
		source.name,
		features.len(),
		ranges.len()
	);

	let params = TileParams {
		clip_bbox: *clip_bbox,
		z: coord.z,
		x: coord.x,
		y: coord.y,
		extent: options.extent,
		tolerance: options.tolerance,
	};
	build_layer(&source.name, options.extent, features, &params)
}
