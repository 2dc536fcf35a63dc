//! In-memory FlatGeobuf fixture builder for the test suites.
//!
//! This is deliberately *not* a general FlatGeobuf writer: it produces just
//! enough of the wire format — tables with vtables, forward references,
//! vectors, the file prologue, a packed R-tree and length-prefixed feature
//! records — to exercise the readers end-to-end. All references are
//! relative, so every built object is relocatable and can simply be
//! appended to a parent buffer.

use crate::header::ColumnType;
use fgbtiles_core::{Blob, GeoBBox};
use fgbtiles_geometry::geo::GeometryKind;
use std::collections::BTreeMap;

/// A field value for [`FixtureTable`].
#[derive(Clone, Debug)]
pub enum FixtureValue {
	Bool(bool),
	U8(u8),
	U16(u16),
	U32(u32),
	U64(u64),
	F64Vec(Vec<f64>),
	U32Vec(Vec<u32>),
	Str(String),
	Bytes(Vec<u8>),
	Table(FixtureTable),
	TableVec(Vec<FixtureTable>),
}

impl FixtureValue {
	fn inline_size(&self) -> usize {
		match self {
			FixtureValue::Bool(_) | FixtureValue::U8(_) => 1,
			FixtureValue::U16(_) => 2,
			FixtureValue::U64(_) => 8,
			// u32 scalars and all references
			_ => 4,
		}
	}

	/// Serializes the referenced object as a relocatable blob, or `None`
	/// for inline scalars.
	///
	/// The second tuple element is the entry offset within the blob a
	/// reference must point at: table blobs lead with their vtable, but
	/// references target the table position (where the soffset lives).
	fn heap_blob(&self) -> Option<(Vec<u8>, usize)> {
		match self {
			FixtureValue::F64Vec(values) => {
				let mut buf = (values.len() as u32).to_le_bytes().to_vec();
				for value in values {
					buf.extend_from_slice(&value.to_le_bytes());
				}
				Some((buf, 0))
			}
			FixtureValue::U32Vec(values) => {
				let mut buf = (values.len() as u32).to_le_bytes().to_vec();
				for value in values {
					buf.extend_from_slice(&value.to_le_bytes());
				}
				Some((buf, 0))
			}
			FixtureValue::Str(text) => {
				let mut buf = (text.len() as u32).to_le_bytes().to_vec();
				buf.extend_from_slice(text.as_bytes());
				Some((buf, 0))
			}
			FixtureValue::Bytes(bytes) => {
				let mut buf = (bytes.len() as u32).to_le_bytes().to_vec();
				buf.extend_from_slice(bytes);
				Some((buf, 0))
			}
			FixtureValue::Table(table) => {
				let blob = table.build();
				let entry = u16::from_le_bytes([blob[0], blob[1]]) as usize;
				Some((blob, entry))
			}
			FixtureValue::TableVec(tables) => {
				// [u32 count][u32 refs..][table blobs..]
				let count = tables.len();
				let mut buf = (count as u32).to_le_bytes().to_vec();
				buf.resize(4 + count * 4, 0);
				for (i, table) in tables.iter().enumerate() {
					let blob = table.build();
					let entry = u16::from_le_bytes([blob[0], blob[1]]) as usize;
					let ref_pos = 4 + i * 4;
					let target = buf.len() + entry;
					buf[ref_pos..ref_pos + 4].copy_from_slice(&((target - ref_pos) as u32).to_le_bytes());
					buf.extend_from_slice(&blob);
				}
				Some((buf, 0))
			}
			_ => None,
		}
	}

	fn inline_bytes(&self) -> Vec<u8> {
		match self {
			FixtureValue::Bool(v) => vec![u8::from(*v)],
			FixtureValue::U8(v) => vec![*v],
			FixtureValue::U16(v) => v.to_le_bytes().to_vec(),
			FixtureValue::U32(v) => v.to_le_bytes().to_vec(),
			FixtureValue::U64(v) => v.to_le_bytes().to_vec(),
			// placeholder for the forward reference, patched later
			_ => vec![0; 4],
		}
	}
}

/// A FlatBuffers table under construction, keyed by field index.
#[derive(Clone, Debug, Default)]
pub struct FixtureTable {
	fields: BTreeMap<u16, FixtureValue>,
}

impl FixtureTable {
	#[must_use]
	pub fn new() -> FixtureTable {
		FixtureTable::default()
	}

	pub fn set(&mut self, field_index: u16, value: FixtureValue) -> &mut Self {
		self.fields.insert(field_index, value);
		self
	}

	/// Serializes `[vtable][table][heap]` as a relocatable blob.
	#[must_use]
	pub fn build(&self) -> Vec<u8> {
		let slot_count = self.fields.keys().next_back().map_or(0, |&max| max as usize + 1);
		let vtable_len = 4 + slot_count * 2;

		// assign inline offsets in field order
		let mut offsets: Vec<u16> = vec![0; slot_count];
		let mut table_size = 4usize; // the i32 soffset
		for (&index, value) in &self.fields {
			offsets[index as usize] = table_size as u16;
			table_size += value.inline_size();
		}

		let mut buf = Vec::new();
		buf.extend_from_slice(&(vtable_len as u16).to_le_bytes());
		buf.extend_from_slice(&(table_size as u16).to_le_bytes());
		for offset in &offsets {
			buf.extend_from_slice(&offset.to_le_bytes());
		}

		// table: soffset back to the vtable, then inline data
		buf.extend_from_slice(&(vtable_len as i32).to_le_bytes());
		let mut patches: Vec<(usize, Vec<u8>, usize)> = Vec::new();
		for value in self.fields.values() {
			if let Some((blob, entry)) = value.heap_blob() {
				patches.push((buf.len(), blob, entry));
			}
			buf.extend_from_slice(&value.inline_bytes());
		}

		for (ref_pos, blob, entry) in patches {
			let target = buf.len() + entry;
			buf[ref_pos..ref_pos + 4].copy_from_slice(&((target - ref_pos) as u32).to_le_bytes());
			buf.extend_from_slice(&blob);
		}

		buf
	}

	/// Serializes with a root-offset prefix, yielding a standalone
	/// FlatBuffer.
	#[must_use]
	pub fn build_with_root(&self) -> Vec<u8> {
		let table = self.build();
		let vtable_len = u16::from_le_bytes([table[0], table[1]]) as u32;
		let mut buf = (4 + vtable_len).to_le_bytes().to_vec();
		buf.extend_from_slice(&table);
		buf
	}
}

/// A property value with its FlatGeobuf column encoding.
#[derive(Clone, Debug)]
pub enum PropValue {
	Bool(bool),
	Short(i16),
	Int(i32),
	UInt(u32),
	Long(i64),
	ULong(u64),
	Double(f64),
	Str(String),
	Bin(Vec<u8>),
}

/// Encodes a property stream: `[u16 column index][value bytes]` pairs.
#[must_use]
pub fn encode_properties(pairs: &[(u16, PropValue)]) -> Vec<u8> {
	let mut buf = Vec::new();
	for (column_index, value) in pairs {
		buf.extend_from_slice(&column_index.to_le_bytes());
		match value {
			PropValue::Bool(v) => buf.push(u8::from(*v)),
			PropValue::Short(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::UInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::Long(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::ULong(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
			PropValue::Str(v) => {
				buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
				buf.extend_from_slice(v.as_bytes());
			}
			PropValue::Bin(v) => {
				buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
				buf.extend_from_slice(v);
			}
		}
	}
	buf
}

/// Builds a geometry table with direct coordinates.
#[must_use]
pub fn geometry_table(xy: &[f64], ends: Option<&[u32]>, kind: Option<GeometryKind>) -> FixtureTable {
	let mut table = FixtureTable::new();
	if let Some(ends) = ends {
		table.set(0, FixtureValue::U32Vec(ends.to_vec()));
	}
	table.set(1, FixtureValue::F64Vec(xy.to_vec()));
	if let Some(kind) = kind {
		table.set(6, FixtureValue::U8(kind as u8));
	}
	table
}

/// Builds a geometry table with nested parts instead of direct coordinates.
#[must_use]
pub fn geometry_table_with_parts(parts: Vec<FixtureTable>, kind: Option<GeometryKind>) -> FixtureTable {
	let mut table = FixtureTable::new();
	table.set(7, FixtureValue::TableVec(parts));
	if let Some(kind) = kind {
		table.set(6, FixtureValue::U8(kind as u8));
	}
	table
}

/// Builds one length-prefixed feature record.
#[must_use]
pub fn feature_record(geometry: FixtureTable, properties: &[u8]) -> Vec<u8> {
	let mut feature = FixtureTable::new();
	feature.set(0, FixtureValue::Table(geometry));
	if !properties.is_empty() {
		feature.set(1, FixtureValue::Bytes(properties.to_vec()));
	}
	let fb = feature.build_with_root();
	let mut record = (fb.len() as u32).to_le_bytes().to_vec();
	record.extend_from_slice(&fb);
	record
}

/// Builds a packed Hilbert R-tree over `(bbox, feature byte offset)` items,
/// laid out root-first with 40-byte nodes.
#[must_use]
pub fn build_index(items: &[(GeoBBox, u64)], node_size: u16) -> Vec<u8> {
	if items.is_empty() {
		return Vec::new();
	}
	let node_size = node_size.max(2) as usize;

	// level counts, bottom-up
	let mut counts = vec![items.len()];
	while *counts.last().unwrap() > 1 {
		counts.push(counts.last().unwrap().div_ceil(node_size));
	}
	let num_levels = counts.len();
	let total: usize = counts.iter().sum();

	// start offset of each level in the root-first array; leaves last
	let mut starts = vec![0usize; num_levels];
	for level in 0..num_levels {
		starts[level] = counts[level + 1..].iter().sum();
	}

	let mut nodes: Vec<(GeoBBox, u64)> = vec![(GeoBBox::new_empty(), 0); total];
	for (k, item) in items.iter().enumerate() {
		nodes[starts[0] + k] = *item;
	}

	for level in 1..num_levels {
		for parent in 0..counts[level] {
			let first_child = parent * node_size;
			let last_child = (first_child + node_size).min(counts[level - 1]);
			let mut bbox = GeoBBox::new_empty();
			for child in first_child..last_child {
				let child_bbox = nodes[starts[level - 1] + child].0;
				bbox.include_point(child_bbox.x_min, child_bbox.y_min);
				bbox.include_point(child_bbox.x_max, child_bbox.y_max);
			}
			nodes[starts[level] + parent] = (bbox, (starts[level - 1] + first_child) as u64);
		}
	}

	let mut buf = Vec::with_capacity(total * 40);
	for (bbox, offset) in nodes {
		buf.extend_from_slice(&bbox.x_min.to_le_bytes());
		buf.extend_from_slice(&bbox.y_min.to_le_bytes());
		buf.extend_from_slice(&bbox.x_max.to_le_bytes());
		buf.extend_from_slice(&bbox.y_max.to_le_bytes());
		buf.extend_from_slice(&offset.to_le_bytes());
	}
	buf
}

/// Assembles complete FlatGeobuf files in memory.
pub struct FgbBuilder {
	geometry_type: GeometryKind,
	columns: Vec<(String, ColumnType)>,
	features: Vec<(GeoBBox, Vec<u8>)>,
	node_size: u16,
}

impl FgbBuilder {
	#[must_use]
	pub fn new(geometry_type: GeometryKind) -> FgbBuilder {
		FgbBuilder {
			geometry_type,
			columns: Vec::new(),
			features: Vec::new(),
			node_size: 16,
		}
	}

	pub fn with_node_size(mut self, node_size: u16) -> Self {
		self.node_size = node_size;
		self
	}

	pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
		self.columns.push((name.to_string(), column_type));
		self
	}

	/// Adds a length-prefixed feature record with its bounding box (used
	/// for the index nodes).
	pub fn feature(mut self, bbox: GeoBBox, record: Vec<u8>) -> Self {
		self.features.push((bbox, record));
		self
	}

	/// Serializes the prologue, index and feature sections.
	#[must_use]
	pub fn build(&self) -> Blob {
		let mut envelope = GeoBBox::new_empty();
		for (bbox, _) in &self.features {
			envelope.include_point(bbox.x_min, bbox.y_min);
			envelope.include_point(bbox.x_max, bbox.y_max);
		}

		let mut header = FixtureTable::new();
		if !self.features.is_empty() {
			header.set(
				1,
				FixtureValue::F64Vec(vec![envelope.x_min, envelope.y_min, envelope.x_max, envelope.y_max]),
			);
		}
		header.set(2, FixtureValue::U8(self.geometry_type as u8));
		if !self.columns.is_empty() {
			let columns = self
				.columns
				.iter()
				.map(|(name, column_type)| {
					let mut column = FixtureTable::new();
					column.set(0, FixtureValue::Str(name.clone()));
					column.set(1, FixtureValue::U8(*column_type as u8));
					column.set(14, FixtureValue::Bool(true));
					column
				})
				.collect();
			header.set(7, FixtureValue::TableVec(columns));
		}
		header.set(8, FixtureValue::U64(self.features.len() as u64));
		header.set(9, FixtureValue::U16(self.node_size));
		let header_fb = header.build_with_root();

		let mut items = Vec::with_capacity(self.features.len());
		let mut offset = 0u64;
		for (bbox, record) in &self.features {
			items.push((*bbox, offset));
			offset += record.len() as u64;
		}

		let mut buf = vec![0x66, 0x67, 0x62, 0x03, 0x66, 0x67, 0x62, 0x00];
		buf.extend_from_slice(&(header_fb.len() as u32).to_le_bytes());
		buf.extend_from_slice(&header_fb);
		buf.extend_from_slice(&build_index(&items, self.node_size));
		for (_, record) in &self.features {
			buf.extend_from_slice(record);
		}
		Blob::from(buf)
	}
}

/// A one-point-per-feature fixture used by several suites.
#[must_use]
pub fn point_fgb(points: &[(f64, f64)]) -> Blob {
	let mut builder = FgbBuilder::new(GeometryKind::Point);
	for &(x, y) in points {
		let bbox = GeoBBox::new(x, y, x, y).unwrap();
		builder = builder.feature(bbox, feature_record(geometry_table(&[x, y], None, None), &[]));
	}
	builder.build()
}
