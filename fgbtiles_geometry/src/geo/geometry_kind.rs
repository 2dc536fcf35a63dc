//! The FlatGeobuf geometry-type enumeration.

/// Geometry type as encoded in a FlatGeobuf header or feature.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GeometryKind {
	#[default]
	Unknown = 0,
	Point = 1,
	LineString = 2,
	Polygon = 3,
	MultiPoint = 4,
	MultiLineString = 5,
	MultiPolygon = 6,
}

impl GeometryKind {
	#[must_use]
	pub fn is_point(&self) -> bool {
		matches!(self, GeometryKind::Point | GeometryKind::MultiPoint)
	}

	#[must_use]
	pub fn is_line(&self) -> bool {
		matches!(self, GeometryKind::LineString | GeometryKind::MultiLineString)
	}

	#[must_use]
	pub fn is_polygon(&self) -> bool {
		matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
	}
}

impl From<u8> for GeometryKind {
	fn from(value: u8) -> Self {
		use GeometryKind::*;
		match value {
			1 => Point,
			2 => LineString,
			3 => Polygon,
			4 => MultiPoint,
			5 => MultiLineString,
			6 => MultiPolygon,
			_ => Unknown,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_u8() {
		assert_eq!(GeometryKind::from(0), GeometryKind::Unknown);
		assert_eq!(GeometryKind::from(1), GeometryKind::Point);
		assert_eq!(GeometryKind::from(6), GeometryKind::MultiPolygon);
		assert_eq!(GeometryKind::from(99), GeometryKind::Unknown);
	}

	#[test]
	fn classification() {
		assert!(GeometryKind::MultiPoint.is_point());
		assert!(GeometryKind::LineString.is_line());
		assert!(GeometryKind::MultiPolygon.is_polygon());
		assert!(!GeometryKind::Unknown.is_polygon());
	}
}
