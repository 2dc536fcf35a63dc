//! The intermediate feature representation shared by the FlatGeobuf decoder
//! and the tiling pipeline.
//!
//! Coordinates live in one flat interleaved buffer `[x0,y0,x1,y1,..]`. Ring
//! and part boundaries are carried as cumulative coordinate-pair counts in
//! `ends`; for MultiPolygons, `parts` lists the indices into `ends` where a
//! new polygon (exterior ring) starts.
//!
//! The projection stage mutates `xy` in place, so a `RawFeature` must not be
//! reused across tile requests.

use super::{GeoProperties, GeometryKind};
use fgbtiles_core::GeoBBox;

/// A decoded feature: flat coordinates, ring structure, properties and an
/// optional id.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFeature {
	pub kind: GeometryKind,
	/// Flat interleaved coordinates `[x0,y0,x1,y1,..]`.
	pub xy: Vec<f64>,
	/// Cumulative coordinate-pair counts marking ring/part ends, e.g. a
	/// polygon with a 4-pair shell and a 3-pair hole has `ends = [4, 7]`.
	/// `None` means a single unstructured sequence.
	pub ends: Option<Vec<usize>>,
	/// Indices into `ends` marking exterior-ring starts; only set for
	/// MultiPolygons with at least two polygons.
	pub parts: Option<Vec<usize>>,
	pub properties: GeoProperties,
	pub id: Option<u64>,
}

impl RawFeature {
	pub fn new(kind: GeometryKind, xy: Vec<f64>) -> RawFeature {
		RawFeature {
			kind,
			xy,
			ends: None,
			parts: None,
			properties: GeoProperties::new(),
			id: None,
		}
	}

	/// Number of coordinate pairs.
	#[must_use]
	pub fn num_points(&self) -> usize {
		self.xy.len() / 2
	}

	/// The ring ends, materialized: a missing `ends` means one ring covering
	/// all pairs.
	#[must_use]
	pub fn ring_ends(&self) -> Vec<usize> {
		match &self.ends {
			Some(ends) if !ends.is_empty() => ends.clone(),
			_ => vec![self.num_points()],
		}
	}

	/// Bounding box over all coordinates.
	#[must_use]
	pub fn bbox(&self) -> GeoBBox {
		GeoBBox::from_flat_coords(&self.xy)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ring_ends_defaults_to_single_ring() {
		let feature = RawFeature::new(GeometryKind::LineString, vec![0.0, 0.0, 1.0, 1.0, 2.0, 0.0]);
		assert_eq!(feature.num_points(), 3);
		assert_eq!(feature.ring_ends(), vec![3]);
	}

	#[test]
	fn bbox() {
		let feature = RawFeature::new(GeometryKind::Point, vec![13.4, 52.5]);
		assert_eq!(feature.bbox().as_tuple(), (13.4, 52.5, 13.4, 52.5));
	}
}
