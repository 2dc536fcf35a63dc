//! Decoding of length-prefixed FlatGeobuf feature records.
//!
//! Each record is `[u32 LE size][FlatBuffer of exactly size]`. A chunk may
//! end mid-record — merged range reads over-fetch by design — so iteration
//! simply stops on exhaustion. Individual malformed features are skipped:
//! degraded output beats failing the whole tile for one bad row.

use crate::flatbuffer::FlatBufferSlice;
use crate::header::{Column, ColumnType, Header};
use fgbtiles_geometry::geo::{GeoProperties, GeoValue, GeometryKind, RawFeature};
use anyhow::Result;
use log::debug;

/// Recursion bound for nested geometry parts; deeper nesting decodes to
/// nothing.
pub const MAX_GEOMETRY_DEPTH: usize = 4;

/// Decodes every complete feature record in `chunk`, up to `max_features`.
///
/// Iteration stops on buffer exhaustion, a zero size prefix, or a record
/// extending past the chunk end (the over-fetched tail of a merged range).
pub fn decode_features(chunk: &[u8], header: &Header, max_features: Option<usize>) -> Result<Vec<RawFeature>> {
	let mut features = Vec::new();
	let mut pos = 0usize;

	while pos + 4 <= chunk.len() {
		if let Some(max) = max_features
			&& features.len() >= max
		{
			break;
		}

		let size = u32::from_le_bytes(chunk[pos..pos + 4].try_into().unwrap()) as usize;
		if size == 0 {
			break;
		}
		if pos + 4 + size > chunk.len() {
			debug!("stopping at truncated feature record ({size} bytes announced, chunk ends)");
			break;
		}

		let fb = FlatBufferSlice::new(&chunk[pos + 4..pos + 4 + size]);
		match decode_one(&fb, header) {
			Ok(Some(feature)) => features.push(feature),
			Ok(None) => {}
			Err(err) => debug!("skipping malformed feature: {err:#}"),
		}
		pos += 4 + size;
	}

	Ok(features)
}

fn decode_one(fb: &FlatBufferSlice<'_>, header: &Header) -> Result<Option<RawFeature>> {
	let root = fb.root_table()?;

	// feature field slots: 0 geometry, 1 properties
	let Some(geometry_field) = fb.field(root, 0)? else {
		return Ok(None);
	};
	let geometry_pos = fb.indirect(geometry_field)?;
	let Some(geometry) = decode_geometry(fb, geometry_pos, header.geometry_type, 0)? else {
		return Ok(None);
	};
	if geometry.xy.is_empty() {
		return Ok(None);
	}

	let mut properties = match fb.field(root, 1)? {
		Some(pos) => decode_properties(fb, fb.indirect(pos)?, &header.columns)?,
		None => GeoProperties::new(),
	};

	// FlatGeobuf has no id slot; an unsigned-integer "id" property is
	// lifted into the feature id
	let id = match properties.get("id") {
		Some(GeoValue::UInt(value)) => {
			let value = *value;
			properties.remove("id");
			Some(value)
		}
		_ => None,
	};

	Ok(Some(RawFeature {
		kind: geometry.kind,
		xy: geometry.xy,
		ends: geometry.ends,
		parts: geometry.parts,
		properties,
		id,
	}))
}

struct DecodedGeometry {
	kind: GeometryKind,
	xy: Vec<f64>,
	ends: Option<Vec<usize>>,
	parts: Option<Vec<usize>>,
}

fn decode_geometry(
	fb: &FlatBufferSlice<'_>,
	table: usize,
	default_kind: GeometryKind,
	depth: usize,
) -> Result<Option<DecodedGeometry>> {
	if depth > MAX_GEOMETRY_DEPTH {
		debug!("geometry nesting deeper than {MAX_GEOMETRY_DEPTH}, ignoring");
		return Ok(None);
	}

	// geometry field slots: 0 ends, 1 xy, 6 type, 7 parts
	let kind = match fb.field(table, 6)? {
		Some(pos) => match fb.read_u8(pos)? {
			0 => default_kind,
			value => GeometryKind::from(value),
		},
		None => default_kind,
	};

	if let Some(pos) = fb.field(table, 1)? {
		let xy = fb.read_f64_vector(fb.indirect(pos)?)?;
		if !xy.is_empty() {
			let ends = match fb.field(table, 0)? {
				Some(pos) => {
					let ends = fb.read_u32_vector(fb.indirect(pos)?)?;
					if ends.is_empty() {
						None
					} else {
						Some(ends.into_iter().map(|end| end as usize).collect())
					}
				}
				None => None,
			};
			return Ok(Some(DecodedGeometry {
				kind,
				xy,
				ends,
				parts: None,
			}));
		}
	}

	// fall back to nested parts
	let Some(parts_field) = fb.field(table, 7)? else {
		return Ok(None);
	};
	let vec_pos = fb.indirect(parts_field)?;
	let part_count = fb.vector_len(vec_pos)?;

	let mut xy = Vec::new();
	let mut ends = Vec::new();
	let mut part_starts = Vec::new();
	let mut base_pairs = 0usize;

	for i in 0..part_count {
		let child_table = fb.indirect(fb.vector_start(vec_pos) + i * 4)?;
		let Some(child) = decode_geometry(fb, child_table, kind, depth + 1)? else {
			continue;
		};
		let child_pairs = child.xy.len() / 2;
		part_starts.push(ends.len());
		match child.ends {
			Some(child_ends) => {
				for end in child_ends {
					ends.push(base_pairs + end);
				}
			}
			None => ends.push(base_pairs + child_pairs),
		}
		base_pairs += child_pairs;
		xy.extend_from_slice(&child.xy);
	}

	if xy.is_empty() {
		return Ok(None);
	}
	let parts = if kind == GeometryKind::MultiPolygon && part_starts.len() >= 2 {
		Some(part_starts)
	} else {
		None
	};
	Ok(Some(DecodedGeometry {
		kind,
		xy,
		ends: Some(ends),
		parts,
	}))
}

/// Decodes the packed property stream against the column schema.
///
/// A column index past the schema, an unknown column type or a truncated
/// value stops parsing; everything decoded so far is kept.
fn decode_properties(fb: &FlatBufferSlice<'_>, vec_pos: usize, columns: &[Column]) -> Result<GeoProperties> {
	let len = fb.vector_len(vec_pos)?;
	let data = fb.read_bytes(fb.vector_start(vec_pos), len)?;

	let mut properties = GeoProperties::new();
	let mut pos = 0usize;

	while pos + 2 <= data.len() {
		let column_index = u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap()) as usize;
		pos += 2;

		let Some(column) = columns.get(column_index) else {
			debug!("property column index {column_index} outside schema, dropping the rest");
			break;
		};
		let Some(col_type) = column.col_type else {
			debug!("unsupported type of column '{}', recording null", column.name);
			properties.insert(column.name.clone(), GeoValue::Null);
			break;
		};

		let Some((value, consumed)) = decode_value(col_type, &data[pos..]) else {
			debug!("truncated value for column '{}', dropping the rest", column.name);
			break;
		};
		pos += consumed;
		properties.insert(column.name.clone(), value);
	}

	Ok(properties)
}

/// Decodes one value; `None` when the remaining bytes are too short.
fn decode_value(col_type: ColumnType, data: &[u8]) -> Option<(GeoValue, usize)> {
	use ColumnType::*;

	let fixed = |n: usize| -> Option<&[u8]> { data.get(0..n) };

	Some(match col_type {
		Bool => (GeoValue::Bool(*data.first()? != 0), 1),
		Byte => (GeoValue::Int(i64::from(*data.first()? as i8)), 1),
		UByte => (GeoValue::UInt(u64::from(*data.first()?)), 1),
		Short => (
			GeoValue::Int(i64::from(i16::from_le_bytes(fixed(2)?.try_into().unwrap()))),
			2,
		),
		UShort => (
			GeoValue::UInt(u64::from(u16::from_le_bytes(fixed(2)?.try_into().unwrap()))),
			2,
		),
		Int => (
			GeoValue::Int(i64::from(i32::from_le_bytes(fixed(4)?.try_into().unwrap()))),
			4,
		),
		UInt => (
			GeoValue::UInt(u64::from(u32::from_le_bytes(fixed(4)?.try_into().unwrap()))),
			4,
		),
		Long => (
			GeoValue::Int(i64::from_le_bytes(fixed(8)?.try_into().unwrap())),
			8,
		),
		ULong => (
			GeoValue::UInt(u64::from_le_bytes(fixed(8)?.try_into().unwrap())),
			8,
		),
		Float => (
			GeoValue::Double(f64::from(f32::from_le_bytes(fixed(4)?.try_into().unwrap()))),
			4,
		),
		Double => (
			GeoValue::Double(f64::from_le_bytes(fixed(8)?.try_into().unwrap())),
			8,
		),
		String | Json | DateTime => {
			let len = u32::from_le_bytes(fixed(4)?.try_into().unwrap()) as usize;
			let bytes = data.get(4..4 + len)?;
			let text = std::str::from_utf8(bytes).ok()?;
			(GeoValue::String(text.to_string()), 4 + len)
		}
		Binary => {
			let len = u32::from_le_bytes(fixed(4)?.try_into().unwrap()) as usize;
			let bytes = data.get(4..4 + len)?;
			(GeoValue::Binary(bytes.to_vec()), 4 + len)
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::*;
	use crate::header::parse_header;
	use fgbtiles_core::GeoBBox;

	fn berlin_fgb() -> (Header, Vec<u8>) {
		let properties = encode_properties(&[
			(0, PropValue::Str("Berlin".to_string())),
			(1, PropValue::ULong(3748148)),
			(2, PropValue::ULong(1)),
		]);
		let blob = FgbBuilder::new(GeometryKind::Point)
			.column("name", ColumnType::String)
			.column("population", ColumnType::ULong)
			.column("id", ColumnType::ULong)
			.feature(
				GeoBBox::new(13.4, 52.5, 13.4, 52.5).unwrap(),
				feature_record(geometry_table(&[13.4, 52.5], None, None), &properties),
			)
			.build();
		let header = parse_header(blob.as_slice()).unwrap();
		let features = blob.as_slice()[header.features_offset as usize..].to_vec();
		(header, features)
	}

	#[test]
	fn decodes_point_with_properties_and_id() -> Result<()> {
		let (header, chunk) = berlin_fgb();
		let features = decode_features(&chunk, &header, None)?;
		assert_eq!(features.len(), 1);

		let feature = &features[0];
		assert_eq!(feature.kind, GeometryKind::Point);
		assert_eq!(feature.xy, vec![13.4, 52.5]);
		assert_eq!(feature.id, Some(1));
		assert_eq!(feature.properties.get("name"), Some(&GeoValue::from("Berlin")));
		assert_eq!(feature.properties.get("population"), Some(&GeoValue::UInt(3748148)));
		assert!(feature.properties.get("id").is_none(), "id is lifted out of the tags");
		Ok(())
	}

	#[test]
	fn max_features_bounds_iteration() -> Result<()> {
		let blob = point_fgb(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
		let header = parse_header(blob.as_slice())?;
		let chunk = &blob.as_slice()[header.features_offset as usize..];
		assert_eq!(decode_features(chunk, &header, Some(2))?.len(), 2);
		assert_eq!(decode_features(chunk, &header, None)?.len(), 3);
		Ok(())
	}

	#[test]
	fn truncated_tail_record_is_ignored() -> Result<()> {
		let blob = point_fgb(&[(0.0, 0.0), (1.0, 1.0)]);
		let header = parse_header(blob.as_slice())?;
		let chunk = &blob.as_slice()[header.features_offset as usize..];
		// cut into the middle of the second record
		let features = decode_features(&chunk[0..chunk.len() - 10], &header, None)?;
		assert_eq!(features.len(), 1);
		Ok(())
	}

	#[test]
	fn zero_size_prefix_terminates() -> Result<()> {
		let blob = point_fgb(&[(0.0, 0.0)]);
		let header = parse_header(blob.as_slice())?;
		let mut chunk = blob.as_slice()[header.features_offset as usize..].to_vec();
		chunk.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0xFF]);
		assert_eq!(decode_features(&chunk, &header, None)?.len(), 1);
		Ok(())
	}

	#[test]
	fn polygon_with_ends() -> Result<()> {
		let xy = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 0.0, 2.0, 2.0, 3.0, 2.0, 2.0, 3.0, 2.0, 2.0];
		let blob = FgbBuilder::new(GeometryKind::Polygon)
			.feature(
				GeoBBox::new(0.0, 0.0, 10.0, 10.0)?,
				feature_record(geometry_table(&xy, Some(&[4, 8]), None), &[]),
			)
			.build();
		let header = parse_header(blob.as_slice())?;
		let features = decode_features(&blob.as_slice()[header.features_offset as usize..], &header, None)?;
		assert_eq!(features[0].ends, Some(vec![4, 8]));
		assert_eq!(features[0].parts, None);
		Ok(())
	}

	#[test]
	fn multipolygon_parts_are_concatenated() -> Result<()> {
		let part1 = geometry_table(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0], Some(&[4]), None);
		let part2 = geometry_table(&[5.0, 5.0, 6.0, 5.0, 6.0, 6.0, 5.0, 5.0], None, None);
		let geometry = geometry_table_with_parts(vec![part1, part2], Some(GeometryKind::MultiPolygon));
		let blob = FgbBuilder::new(GeometryKind::MultiPolygon)
			.feature(GeoBBox::new(0.0, 0.0, 6.0, 6.0)?, feature_record(geometry, &[]))
			.build();
		let header = parse_header(blob.as_slice())?;
		let features = decode_features(&blob.as_slice()[header.features_offset as usize..], &header, None)?;

		let feature = &features[0];
		assert_eq!(feature.kind, GeometryKind::MultiPolygon);
		assert_eq!(feature.num_points(), 8);
		assert_eq!(feature.ends, Some(vec![4, 8]));
		assert_eq!(feature.parts, Some(vec![0, 1]));
		Ok(())
	}

	#[test]
	fn excessive_nesting_decodes_to_nothing() -> Result<()> {
		let mut geometry = geometry_table(&[0.0, 0.0], None, None);
		for _ in 0..6 {
			geometry = geometry_table_with_parts(vec![geometry], Some(GeometryKind::MultiPolygon));
		}
		let blob = FgbBuilder::new(GeometryKind::MultiPolygon)
			.feature(GeoBBox::new(0.0, 0.0, 1.0, 1.0)?, feature_record(geometry, &[]))
			.build();
		let header = parse_header(blob.as_slice())?;
		let features = decode_features(&blob.as_slice()[header.features_offset as usize..], &header, None)?;
		assert!(features.is_empty());
		Ok(())
	}

	#[test]
	fn truncated_property_value_keeps_earlier_ones() -> Result<()> {
		let mut properties = encode_properties(&[(0, PropValue::Str("kept".to_string()))]);
		// column 1 announces an 8-byte ULong but delivers only 3 bytes
		properties.extend_from_slice(&[1, 0, 0xAA, 0xBB, 0xCC]);
		let blob = FgbBuilder::new(GeometryKind::Point)
			.column("name", ColumnType::String)
			.column("count", ColumnType::ULong)
			.feature(
				GeoBBox::new(0.0, 0.0, 0.0, 0.0)?,
				feature_record(geometry_table(&[0.0, 0.0], None, None), &properties),
			)
			.build();
		let header = parse_header(blob.as_slice())?;
		let features = decode_features(&blob.as_slice()[header.features_offset as usize..], &header, None)?;

		let properties = &features[0].properties;
		assert_eq!(properties.get("name"), Some(&GeoValue::from("kept")));
		assert!(properties.get("count").is_none());
		Ok(())
	}

	#[test]
	fn out_of_schema_column_index_stops_parsing() -> Result<()> {
		let mut properties = encode_properties(&[(0, PropValue::Bool(true))]);
		properties.extend_from_slice(&[9, 0, 1]);
		let blob = FgbBuilder::new(GeometryKind::Point)
			.column("flag", ColumnType::Bool)
			.feature(
				GeoBBox::new(0.0, 0.0, 0.0, 0.0)?,
				feature_record(geometry_table(&[0.0, 0.0], None, None), &properties),
			)
			.build();
		let header = parse_header(blob.as_slice())?;
		let features = decode_features(&blob.as_slice()[header.features_offset as usize..], &header, None)?;
		assert_eq!(features[0].properties.get("flag"), Some(&GeoValue::Bool(true)));
		assert_eq!(features[0].properties.len(), 1);
		Ok(())
	}

	#[test]
	fn value_decoding_covers_all_types() {
		assert_eq!(
			decode_value(ColumnType::Byte, &[0xFF]),
			Some((GeoValue::Int(-1), 1))
		);
		assert_eq!(
			decode_value(ColumnType::Short, &[0xFE, 0xFF]),
			Some((GeoValue::Int(-2), 2))
		);
		assert_eq!(
			decode_value(ColumnType::Float, &[0x00, 0x00, 0x80, 0x3F]),
			Some((GeoValue::Double(1.0), 4))
		);
		assert_eq!(
			decode_value(ColumnType::Binary, &[2, 0, 0, 0, 0xAB, 0xCD]),
			Some((GeoValue::Binary(vec![0xAB, 0xCD]), 6))
		);
		assert_eq!(decode_value(ColumnType::Long, &[1, 2, 3]), None);
	}
}
