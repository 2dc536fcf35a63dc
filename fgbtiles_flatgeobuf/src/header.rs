//! FlatGeobuf file prologue: magic validation, header table decoding and
//! the derived byte offsets of the index and feature sections.
//!
//! File layout: `[8-byte magic][u32 LE header size][header FlatBuffer]
//! [packed R-tree index][length-prefixed feature records]`.

use crate::flatbuffer::FlatBufferSlice;
use fgbtiles_core::GeoBBox;
use fgbtiles_geometry::geo::GeometryKind;
use anyhow::{Context, Result, bail, ensure};

/// The first seven magic bytes: `fgb\x03fgb`. The eighth (patch version)
/// byte is accepted as any value.
pub const MAGIC: [u8; 7] = [0x66, 0x67, 0x62, 0x03, 0x66, 0x67, 0x62];

/// Magic plus the `u32` header-size prefix.
pub const PROLOGUE_SIZE: u64 = 12;

/// Size of one packed R-tree node: 4 x f64 bbox + u64 offset.
pub const INDEX_NODE_SIZE: u64 = 40;

/// A property column type as stored in the header schema.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnType {
	Byte = 0,
	UByte = 1,
	Bool = 2,
	Short = 3,
	UShort = 4,
	Int = 5,
	UInt = 6,
	Long = 7,
	ULong = 8,
	Float = 9,
	Double = 10,
	String = 11,
	Json = 12,
	DateTime = 13,
	Binary = 14,
}

impl ColumnType {
	/// Maps the wire value; `None` for types outside the defined enum.
	#[must_use]
	pub fn from_u8(value: u8) -> Option<ColumnType> {
		use ColumnType::*;
		Some(match value {
			0 => Byte,
			1 => UByte,
			2 => Bool,
			3 => Short,
			4 => UShort,
			5 => Int,
			6 => UInt,
			7 => Long,
			8 => ULong,
			9 => Float,
			10 => Double,
			11 => String,
			12 => Json,
			13 => DateTime,
			14 => Binary,
			_ => return None,
		})
	}
}

/// One column of the property schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
	pub name: String,
	/// `None` for column types this implementation does not know; their
	/// values decode as null and stop the feature's property stream.
	pub col_type: Option<ColumnType>,
	pub nullable: bool,
}

/// The decoded file header with derived offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
	pub geometry_type: GeometryKind,
	pub columns: Vec<Column>,
	pub features_count: u64,
	/// R-tree fan-out; `0` means the file carries no index.
	pub index_node_size: u16,
	pub envelope: Option<GeoBBox>,
	/// Absolute byte offset of the index section.
	pub index_offset: u64,
	/// Byte size of the index section; `0` when there is no index.
	pub index_size: u64,
	/// Absolute byte offset of the feature section.
	pub features_offset: u64,
}

/// Reads only the magic and the header-size prefix, so callers can size
/// their second read.
///
/// Returns the total prologue size `12 + header FlatBuffer size`.
pub fn header_byte_size(first_bytes: &[u8]) -> Result<u64> {
	ensure!(
		first_bytes.len() >= PROLOGUE_SIZE as usize,
		"short read: got {} bytes, need at least {PROLOGUE_SIZE} for the file prologue",
		first_bytes.len()
	);
	check_magic(first_bytes)?;
	let header_fb_size = u32::from_le_bytes(first_bytes[8..12].try_into().unwrap());
	Ok(PROLOGUE_SIZE + u64::from(header_fb_size))
}

fn check_magic(bytes: &[u8]) -> Result<()> {
	if bytes.len() < 8 || bytes[0..7] != MAGIC {
		bail!("invalid FlatGeobuf magic");
	}
	Ok(())
}

/// Parses the complete prologue and computes the derived offsets.
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
	let total_size = header_byte_size(bytes)?;
	ensure!(
		bytes.len() as u64 >= total_size,
		"short read: got {} bytes, header needs {total_size}",
		bytes.len()
	);

	let fb = FlatBufferSlice::new(&bytes[PROLOGUE_SIZE as usize..total_size as usize]);
	let root = fb.root_table().context("malformed header flatbuffer")?;

	// header field slots: 0 name, 1 envelope, 2 geometry type, 3..6
	// hasZ/M/T/TM, 7 columns, 8 features count, 9 index node size
	let envelope = match fb.field(root, 1)? {
		Some(pos) => {
			let vec_pos = fb.indirect(pos)?;
			let values = fb.read_f64_vector(vec_pos).context("malformed envelope")?;
			if values.len() == 4 {
				Some(GeoBBox::try_from(values.as_slice())?)
			} else {
				None
			}
		}
		None => None,
	};

	let geometry_type = match fb.field(root, 2)? {
		Some(pos) => GeometryKind::from(fb.read_u8(pos)?),
		None => GeometryKind::Unknown,
	};

	let columns = match fb.field(root, 7)? {
		Some(pos) => parse_columns(&fb, fb.indirect(pos)?)?,
		None => Vec::new(),
	};

	let features_count = match fb.field(root, 8)? {
		Some(pos) => fb.read_u64(pos)?,
		None => 0,
	};

	let index_node_size = match fb.field(root, 9)? {
		Some(pos) => fb.read_u16(pos)?,
		// schema default
		None => 16,
	};

	let index_offset = total_size;
	let index_size = packed_index_size(features_count, index_node_size);

	Ok(Header {
		geometry_type,
		columns,
		features_count,
		index_node_size,
		envelope,
		index_offset,
		index_size,
		features_offset: index_offset + index_size,
	})
}

fn parse_columns(fb: &FlatBufferSlice<'_>, vec_pos: usize) -> Result<Vec<Column>> {
	let len = fb.vector_len(vec_pos)?;
	let mut columns = Vec::with_capacity(len);
	for i in 0..len {
		let table = fb
			.indirect(fb.vector_start(vec_pos) + i * 4)
			.with_context(|| format!("malformed column table {i}"))?;

		// column field slots: 0 name, 1 type, 14 nullable
		let name = match fb.field(table, 0)? {
			Some(pos) => fb.read_string(fb.indirect(pos)?)?,
			None => String::new(),
		};
		let col_type = match fb.field(table, 1)? {
			Some(pos) => ColumnType::from_u8(fb.read_u8(pos)?),
			None => Some(ColumnType::Byte),
		};
		let nullable = match fb.field(table, 14)? {
			Some(pos) => fb.read_u8(pos)? != 0,
			None => true,
		};
		columns.push(Column { name, col_type, nullable });
	}
	Ok(columns)
}

/// Total byte size of a packed R-tree over `num_items` features.
///
/// Levels are built bottom-up with `ceil(previous / node_size)` until a
/// single root node remains.
#[must_use]
pub fn packed_index_size(num_items: u64, node_size: u16) -> u64 {
	if node_size == 0 || num_items == 0 {
		return 0;
	}
	let node_size = u64::from(node_size.max(2));
	let mut count = num_items;
	let mut total = count;
	while count > 1 {
		count = count.div_ceil(node_size);
		total += count;
	}
	total * INDEX_NODE_SIZE
}

/// The per-level node index bounds `[start, end)` of a packed R-tree,
/// leaf level first, in the root-first array layout.
#[must_use]
pub fn packed_index_level_bounds(num_items: u64, node_size: u16) -> Vec<(u64, u64)> {
	let node_size = u64::from(node_size.max(2));
	let mut counts = vec![num_items];
	while *counts.last().unwrap() > 1 {
		let next = counts.last().unwrap().div_ceil(node_size);
		counts.push(next);
	}

	let mut bounds = Vec::with_capacity(counts.len());
	for (level, &count) in counts.iter().enumerate() {
		let start: u64 = counts[level + 1..].iter().sum();
		bounds.push((start, start + count));
	}
	bounds
}
