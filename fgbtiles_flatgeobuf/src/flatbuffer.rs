//! A read-only decoder for the FlatBuffers wire format.
//!
//! All multi-byte scalars are little-endian; offsets are byte positions
//! relative to the start of the buffer view. Every access is bounds-checked
//! and misaligned reads are legal (`from_le_bytes` over byte slices), so
//! adversarial buffers fail with an error instead of faulting.

use anyhow::{Result, bail, ensure};

/// A borrowed FlatBuffers view.
#[derive(Clone, Copy, Debug)]
pub struct FlatBufferSlice<'a> {
	buf: &'a [u8],
}

impl<'a> FlatBufferSlice<'a> {
	#[must_use]
	pub fn new(buf: &'a [u8]) -> FlatBufferSlice<'a> {
		FlatBufferSlice { buf }
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	fn bytes_at(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
		match self.buf.get(pos..pos + len) {
			Some(bytes) => Ok(bytes),
			None => bail!(
				"flatbuffer read of {len} bytes at position {pos} is out of bounds (buffer is {} bytes)",
				self.buf.len()
			),
		}
	}

	pub fn read_u8(&self, pos: usize) -> Result<u8> {
		Ok(self.bytes_at(pos, 1)?[0])
	}

	pub fn read_u16(&self, pos: usize) -> Result<u16> {
		Ok(u16::from_le_bytes(self.bytes_at(pos, 2)?.try_into().unwrap()))
	}

	pub fn read_i16(&self, pos: usize) -> Result<i16> {
		Ok(i16::from_le_bytes(self.bytes_at(pos, 2)?.try_into().unwrap()))
	}

	pub fn read_u32(&self, pos: usize) -> Result<u32> {
		Ok(u32::from_le_bytes(self.bytes_at(pos, 4)?.try_into().unwrap()))
	}

	pub fn read_i32(&self, pos: usize) -> Result<i32> {
		Ok(i32::from_le_bytes(self.bytes_at(pos, 4)?.try_into().unwrap()))
	}

	pub fn read_u64(&self, pos: usize) -> Result<u64> {
		Ok(u64::from_le_bytes(self.bytes_at(pos, 8)?.try_into().unwrap()))
	}

	pub fn read_i64(&self, pos: usize) -> Result<i64> {
		Ok(i64::from_le_bytes(self.bytes_at(pos, 8)?.try_into().unwrap()))
	}

	pub fn read_f32(&self, pos: usize) -> Result<f32> {
		Ok(f32::from_le_bytes(self.bytes_at(pos, 4)?.try_into().unwrap()))
	}

	pub fn read_f64(&self, pos: usize) -> Result<f64> {
		Ok(f64::from_le_bytes(self.bytes_at(pos, 8)?.try_into().unwrap()))
	}

	/// Position of the root table: the `u32` at byte 0.
	pub fn root_table(&self) -> Result<usize> {
		Ok(self.read_u32(0)? as usize)
	}

	/// Position of a table's vtable: `table_pos - i32 at table_pos`.
	pub fn vtable(&self, table_pos: usize) -> Result<usize> {
		let soffset = i64::from(self.read_i32(table_pos)?);
		let vtable_pos = table_pos as i64 - soffset;
		ensure!(
			vtable_pos >= 0 && (vtable_pos as usize) < self.buf.len(),
			"flatbuffer vtable position {vtable_pos} is out of bounds"
		);
		Ok(vtable_pos as usize)
	}

	/// Absolute position of a table field, or `None` when the field is
	/// absent (slot past the vtable size, or slot value zero).
	pub fn field(&self, table_pos: usize, field_index: usize) -> Result<Option<usize>> {
		let vtable_pos = self.vtable(table_pos)?;
		let vtable_size = self.read_u16(vtable_pos)? as usize;
		let slot = 4 + field_index * 2;
		if slot + 2 > vtable_size {
			return Ok(None);
		}
		let field_offset = self.read_u16(vtable_pos + slot)? as usize;
		if field_offset == 0 {
			return Ok(None);
		}
		Ok(Some(table_pos + field_offset))
	}

	/// Follows a forward reference: `pos + u32 at pos`.
	pub fn indirect(&self, pos: usize) -> Result<usize> {
		let target = pos + self.read_u32(pos)? as usize;
		ensure!(
			target <= self.buf.len(),
			"flatbuffer indirect offset at {pos} points past the buffer"
		);
		Ok(target)
	}

	/// Element count of a vector at `vec_pos`.
	pub fn vector_len(&self, vec_pos: usize) -> Result<usize> {
		Ok(self.read_u32(vec_pos)? as usize)
	}

	/// Position of a vector's first element.
	#[must_use]
	pub fn vector_start(&self, vec_pos: usize) -> usize {
		vec_pos + 4
	}

	/// Reads a length-prefixed UTF-8 string at `pos`.
	pub fn read_string(&self, pos: usize) -> Result<String> {
		let len = self.read_u32(pos)? as usize;
		let bytes = self.bytes_at(pos + 4, len)?;
		Ok(String::from_utf8(bytes.to_vec())?)
	}

	/// Reads an `f64` vector into an owned buffer.
	///
	/// Owned output severs any aliasing with the underlying bytes: the
	/// projection stage mutates coordinate buffers in place.
	pub fn read_f64_vector(&self, vec_pos: usize) -> Result<Vec<f64>> {
		let len = self.vector_len(vec_pos)?;
		let bytes = self.bytes_at(self.vector_start(vec_pos), len * 8)?;
		Ok(
			bytes
				.chunks_exact(8)
				.map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap()))
				.collect(),
		)
	}

	/// Reads a `u32` vector into an owned buffer.
	pub fn read_u32_vector(&self, vec_pos: usize) -> Result<Vec<u32>> {
		let len = self.vector_len(vec_pos)?;
		let bytes = self.bytes_at(self.vector_start(vec_pos), len * 4)?;
		Ok(
			bytes
				.chunks_exact(4)
				.map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
				.collect(),
		)
	}

	/// Returns a sub-view without copying.
	pub fn read_bytes(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
		self.bytes_at(pos, len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::{FixtureTable, FixtureValue};

	#[test]
	fn scalar_reads_are_bounds_checked() {
		let fb = FlatBufferSlice::new(&[1, 2, 3]);
		assert_eq!(fb.read_u8(2).unwrap(), 3);
		assert!(fb.read_u8(3).is_err());
		assert!(fb.read_u32(0).is_err());
		assert_eq!(FlatBufferSlice::new(&[1, 2, 3, 4]).read_u32(0).unwrap(), 0x04030201);
	}

	#[test]
	fn unaligned_reads_do_not_fault() {
		let data = [0u8, 0, 0, 0, 0, 0, 0, 0xF0, 0x3F, 0xFF];
		// f64 1.0 starting at the odd offset 1
		assert_eq!(FlatBufferSlice::new(&data).read_f64(1).unwrap(), 1.0);
	}

	#[test]
	fn table_field_resolution() -> Result<()> {
		let mut table = FixtureTable::new();
		table.set(0, FixtureValue::U8(7));
		table.set(2, FixtureValue::U64(1234));
		let buf = table.build_with_root();
		let fb = FlatBufferSlice::new(&buf);
		let root = fb.root_table()?;

		let pos0 = fb.field(root, 0)?.expect("field 0 present");
		assert_eq!(fb.read_u8(pos0)?, 7);
		assert!(fb.field(root, 1)?.is_none(), "unset slot");
		let pos2 = fb.field(root, 2)?.expect("field 2 present");
		assert_eq!(fb.read_u64(pos2)?, 1234);
		assert!(fb.field(root, 9)?.is_none(), "slot past vtable");
		Ok(())
	}

	#[test]
	fn vectors_and_strings() -> Result<()> {
		let mut table = FixtureTable::new();
		table.set(0, FixtureValue::Str("hello".to_string()));
		table.set(1, FixtureValue::F64Vec(vec![1.5, -2.5]));
		table.set(2, FixtureValue::U32Vec(vec![4, 7]));
		let buf = table.build_with_root();
		let fb = FlatBufferSlice::new(&buf);
		let root = fb.root_table()?;

		let str_pos = fb.indirect(fb.field(root, 0)?.unwrap())?;
		assert_eq!(fb.read_string(str_pos)?, "hello");

		let f64_pos = fb.indirect(fb.field(root, 1)?.unwrap())?;
		assert_eq!(fb.vector_len(f64_pos)?, 2);
		assert_eq!(fb.read_f64_vector(f64_pos)?, vec![1.5, -2.5]);

		let u32_pos = fb.indirect(fb.field(root, 2)?.unwrap())?;
		assert_eq!(fb.read_u32_vector(u32_pos)?, vec![4, 7]);
		Ok(())
	}

	#[test]
	fn truncated_vector_fails() {
		let mut table = FixtureTable::new();
		table.set(0, FixtureValue::F64Vec(vec![1.0, 2.0]));
		let mut buf = table.build_with_root();
		buf.truncate(buf.len() - 4);
		let fb = FlatBufferSlice::new(&buf);
		let root = fb.root_table().unwrap();
		let vec_pos = fb.indirect(fb.field(root, 0).unwrap().unwrap()).unwrap();
		assert!(fb.read_f64_vector(vec_pos).is_err());
	}
}
