//! This module provides the [`GeoBBox`] struct, an axis-aligned bounding box
//! over `f64` coordinates.
//!
//! The same type serves both coordinate spaces the tiling pipeline moves
//! through: WGS84 degrees (spatial-index queries) and Web Mercator unit
//! space (clipping). The box itself is space-agnostic; only the invariants
//! `x_min <= x_max` and `y_min <= y_max` are enforced.

use anyhow::{Result, ensure};
use std::fmt::Debug;

/// Latitude limit of the Web Mercator projection.
pub static MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// An axis-aligned bounding box: `x_min, y_min, x_max, y_max`.
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl GeoBBox {
	/// Creates a new box, checking the min/max ordering.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		Ok(GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// A degenerate box suitable as the start of a fold over points.
	#[must_use]
	pub fn new_empty() -> GeoBBox {
		GeoBBox {
			x_min: f64::INFINITY,
			y_min: f64::INFINITY,
			x_max: f64::NEG_INFINITY,
			y_max: f64::NEG_INFINITY,
		}
	}

	/// Computes the bounding box of a flat `[x0,y0,x1,y1,..]` sequence.
	#[must_use]
	pub fn from_flat_coords(xy: &[f64]) -> GeoBBox {
		let mut bbox = GeoBBox::new_empty();
		for pair in xy.chunks_exact(2) {
			bbox.include_point(pair[0], pair[1]);
		}
		bbox
	}

	pub fn include_point(&mut self, x: f64, y: f64) {
		self.x_min = self.x_min.min(x);
		self.y_min = self.y_min.min(y);
		self.x_max = self.x_max.max(x);
		self.y_max = self.y_max.max(y);
	}

	/// Boundary-inclusive intersection test.
	#[must_use]
	pub fn intersects(&self, other: &GeoBBox) -> bool {
		!(self.x_max < other.x_min
			|| self.x_min > other.x_max
			|| self.y_max < other.y_min
			|| self.y_min > other.y_max)
	}

	/// Returns `true` if `other` lies entirely inside this box.
	#[must_use]
	pub fn contains_bbox(&self, other: &GeoBBox) -> bool {
		other.x_min >= self.x_min && other.x_max <= self.x_max && other.y_min >= self.y_min && other.y_max <= self.y_max
	}

	/// Boundary-inclusive point containment.
	#[must_use]
	pub fn contains_point(&self, x: f64, y: f64) -> bool {
		x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
	}

	/// Clamps the box in-place to the latitude/longitude limits of the Web
	/// Mercator projection.
	pub fn limit_to_mercator(&mut self) {
		self.x_min = self.x_min.clamp(-180.0, 180.0);
		self.x_max = self.x_max.clamp(-180.0, 180.0);
		self.y_min = self.y_min.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
		self.y_max = self.y_max.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
	}

	#[must_use]
	pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
		(self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// `(x_max - x_min) * (y_max - y_min)`; zero for degenerate boxes.
	#[must_use]
	pub fn area(&self) -> f64 {
		if self.x_max < self.x_min || self.y_max < self.y_min {
			0.0
		} else {
			(self.x_max - self.x_min) * (self.y_max - self.y_min)
		}
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"GeoBBox[{}, {}, {}, {}]",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

impl TryFrom<&[f64]> for GeoBBox {
	type Error = anyhow::Error;

	fn try_from(value: &[f64]) -> Result<Self> {
		ensure!(value.len() == 4, "bbox must have 4 elements, got {}", value.len());
		GeoBBox::new(value[0], value[1], value[2], value[3])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_checks_ordering() {
		assert!(GeoBBox::new(-10.0, -5.0, 10.0, 5.0).is_ok());
		assert!(GeoBBox::new(10.0, -5.0, -10.0, 5.0).is_err());
		assert!(GeoBBox::new(-10.0, 5.0, 10.0, -5.0).is_err());
	}

	#[test]
	fn intersects_is_boundary_inclusive() {
		let a = GeoBBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
		let touching = GeoBBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
		let disjoint = GeoBBox::new(10.1, 10.1, 20.0, 20.0).unwrap();
		assert!(a.intersects(&touching));
		assert!(!a.intersects(&disjoint));
	}

	#[test]
	fn contains() {
		let a = GeoBBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
		assert!(a.contains_bbox(&GeoBBox::new(1.0, 1.0, 9.0, 9.0).unwrap()));
		assert!(!a.contains_bbox(&GeoBBox::new(1.0, 1.0, 11.0, 9.0).unwrap()));
		assert!(a.contains_point(0.0, 10.0));
		assert!(!a.contains_point(-0.1, 5.0));
	}

	#[test]
	fn from_flat_coords() {
		let bbox = GeoBBox::from_flat_coords(&[1.0, 7.0, -2.0, 3.0, 4.0, 5.0]);
		assert_eq!(bbox.as_tuple(), (-2.0, 3.0, 4.0, 7.0));
	}

	#[test]
	fn limit_to_mercator() {
		let mut bbox = GeoBBox::new(-200.0, -90.0, 200.0, 90.0).unwrap();
		bbox.limit_to_mercator();
		assert_eq!(
			bbox.as_tuple(),
			(-180.0, -MAX_MERCATOR_LAT, 180.0, MAX_MERCATOR_LAT)
		);
	}
}
