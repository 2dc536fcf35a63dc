//! The per-feature tiling pipeline: project, clip, simplify, transform,
//! wind, encode.
//!
//! Every stage works on the flat interleaved coordinate layout produced by
//! the FlatGeobuf decoder. Stages are pure functions wired together by
//! [`process_feature`]; [`build_layer`] runs the pipeline over a batch of
//! features and assembles a finished [`VectorTileLayer`] with interned tag
//! tables.

mod clip;
mod project;
mod simplify;
mod transform;
mod winding;

pub use clip::clip_feature;
pub use project::{project_in_place, project_x, project_y};
pub use simplify::simplify_feature;
pub use transform::transform_to_tile;
pub use winding::{correct_winding, ring_shoelace};

use crate::geo::{GeoProperties, GeometryKind, RawFeature};
use crate::vector_tile::{GeomType, VectorTileFeature, VectorTileLayer};
use anyhow::Result;
use fgbtiles_core::GeoBBox;
use log::trace;

/// Working geometry between pipeline stages: flat coordinates plus ring
/// bounds, in whatever coordinate space the previous stage produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RingBuffer {
	pub xy: Vec<f64>,
	/// Cumulative coordinate-pair counts; one entry per ring/part.
	pub ends: Vec<usize>,
	/// Indices into `ends` marking exterior rings (MultiPolygon only).
	pub parts: Option<Vec<usize>>,
}

/// Resolved per-tile parameters consumed by the pipeline.
#[derive(Clone, Copy, Debug)]
pub struct TileParams {
	/// Clip rectangle in Mercator unit space, buffer already applied.
	pub clip_bbox: GeoBBox,
	pub z: u8,
	pub x: u32,
	pub y: u32,
	pub extent: u32,
	/// Simplification tolerance in tile pixels; `0` disables the stage.
	pub tolerance: f64,
}

impl TileParams {
	/// Squared tolerance in Mercator unit space.
	#[must_use]
	pub fn sq_tolerance(&self) -> f64 {
		let t = self.tolerance / (f64::from(1u32 << self.z) * f64::from(self.extent));
		t * t
	}
}

/// A feature geometry in integer tile coordinates, ready for command
/// encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGeometry {
	pub geom_type: GeomType,
	pub coords: Vec<i32>,
	pub ends: Vec<usize>,
}

/// Iterates ring ranges `(start_pair, end_pair)` over cumulative ends.
pub(crate) fn ring_ranges(ends: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
	ends.iter().scan(0usize, |start, &end| {
		let range = (*start, end);
		*start = end;
		Some(range)
	})
}

/// Rebuilds a `parts` list after rings were dropped.
///
/// Each original polygon is the ring group `[parts[i], parts[i+1])`; a group
/// with at least one surviving ring contributes the new index of its first
/// survivor. Fewer than two surviving polygons collapse to `None`.
pub(crate) fn remap_parts(parts: &[usize], ring_count: usize, new_index: &[Option<usize>]) -> Option<Vec<usize>> {
	let mut new_parts = Vec::with_capacity(parts.len());
	for (i, &start) in parts.iter().enumerate() {
		let end = parts.get(i + 1).copied().unwrap_or(ring_count);
		if let Some(idx) = (start..end).find_map(|ring| new_index.get(ring).copied().flatten()) {
			new_parts.push(idx);
		}
	}
	if new_parts.len() < 2 { None } else { Some(new_parts) }
}

/// Runs one feature through all geometry stages.
///
/// Returns `None` when the feature is clipped or simplified away. The
/// feature's coordinate buffer is mutated in place by the projection stage.
pub fn process_feature(mut feature: RawFeature, params: &TileParams) -> Option<TileGeometry> {
	if feature.xy.is_empty() {
		return None;
	}

	project_in_place(&mut feature.xy);

	let ends = feature.ring_ends();
	let buffer = clip_feature(
		feature.kind,
		&feature.xy,
		&ends,
		feature.parts.as_deref(),
		&params.clip_bbox,
	)?;

	let buffer = if params.tolerance > 0.0 && !feature.kind.is_point() {
		simplify_feature(buffer, params.sq_tolerance(), feature.kind.is_polygon())?
	} else {
		buffer
	};

	let mut coords = transform_to_tile(&buffer.xy, params.z, params.x, params.y, params.extent);
	correct_winding(&mut coords, &buffer.ends, buffer.parts.as_deref(), feature.kind);

	Some(TileGeometry {
		geom_type: GeomType::from(feature.kind),
		coords,
		ends: buffer.ends,
	})
}

/// Runs the pipeline over all decoded features of one source and assembles
/// the layer: geometry command streams plus deduplicated key/value tables.
///
/// Property values that cannot be represented in MVT (`Null`, `Binary`) are
/// filtered; numeric values are canonicalized while interning. Features
/// whose geometry collapses to an empty command stream are dropped.
pub fn build_layer(name: &str, extent: u32, features: Vec<RawFeature>, params: &TileParams) -> Result<VectorTileLayer> {
	let mut layer = VectorTileLayer::new(name.to_string(), extent);

	for mut feature in features {
		let id = feature.id.take();
		let properties = std::mem::take(&mut feature.properties);
		let Some(geometry) = process_feature(feature, params) else {
			continue;
		};

		let tag_ids = encode_tags(&mut layer, properties);
		let encoded = VectorTileFeature::from_tile_coords(id, tag_ids, geometry.geom_type, &geometry.coords, &geometry.ends)?;
		if encoded.geom_data.is_empty() {
			trace!("dropping feature with empty command stream in layer '{name}'");
			continue;
		}
		layer.features.push(encoded);
	}

	Ok(layer)
}

fn encode_tags(layer: &mut VectorTileLayer, properties: GeoProperties) -> Vec<u32> {
	let mut tag_ids = Vec::new();
	for (key, value) in properties {
		if let Some(mvt_value) = value.into_mvt_value() {
			tag_ids.push(layer.property_manager.add_key(key));
			tag_ids.push(layer.property_manager.add_val(mvt_value));
		}
	}
	tag_ids
}

impl From<GeometryKind> for GeomType {
	fn from(kind: GeometryKind) -> Self {
		use GeometryKind::*;
		match kind {
			LineString | MultiLineString => GeomType::LineString,
			Polygon | MultiPolygon => GeomType::Polygon,
			// Unknown falls back to point
			Point | MultiPoint | Unknown => GeomType::Point,
		}
	}
}
