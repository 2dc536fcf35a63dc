//! `Tile.Feature` messages and the MVT geometry command encoding.
//!
//! A command integer packs `(cmd & 0x7) | (count << 3)`; parameters are
//! zigzag-encoded deltas against a cursor that starts at `(0, 0)` and
//! persists across all rings of one feature.

use super::geometry_type::GeomType;
use fgbtiles_core::{
	Blob,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};
use anyhow::{Context, Result, bail};
use byteorder::LE;

const CMD_MOVE_TO: u64 = 1;
const CMD_LINE_TO: u64 = 2;
const CMD_CLOSE_PATH: u64 = 7;

#[derive(Clone, Debug, PartialEq)]
pub struct VectorTileFeature {
	pub id: Option<u64>,
	pub tag_ids: Vec<u32>,
	pub geom_type: GeomType,
	pub geom_data: Blob,
}

impl Default for VectorTileFeature {
	fn default() -> Self {
		VectorTileFeature {
			id: None,
			tag_ids: Vec::new(),
			geom_type: GeomType::Unknown,
			geom_data: Blob::new_empty(),
		}
	}
}

impl VectorTileFeature {
	/// Decodes a feature message.
	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileFeature> {
		let mut feature = VectorTileFeature::default();

		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 0) => feature.id = Some(reader.read_varint().context("failed to read feature id")?),
				(2, 2) => feature.tag_ids = reader.read_pbf_packed_uint32().context("failed to read tag ids")?,
				(3, 0) => {
					feature.geom_type = GeomType::from(reader.read_varint().context("failed to read geometry type")?)
				}
				(4, 2) => feature.geom_data = reader.read_pbf_blob().context("failed to read geometry data")?,
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		Ok(feature)
	}

	/// Serializes the feature message.
	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		if let Some(id) = self.id {
			writer.write_pbf_key(1, 0)?;
			writer.write_varint(id)?;
		}

		if !self.tag_ids.is_empty() {
			writer.write_pbf_key(2, 2)?;
			writer.write_pbf_packed_uint32(&self.tag_ids)?;
		}

		writer.write_pbf_key(3, 0)?;
		writer.write_varint(self.geom_type.as_u64())?;

		if !self.geom_data.is_empty() {
			writer.write_pbf_key(4, 2)?;
			writer.write_pbf_blob(&self.geom_data)?;
		}

		Ok(writer.into_blob())
	}

	/// Command-encodes a geometry in integer tile coordinates.
	///
	/// `coords` is the flat `[x0,y0,..]` buffer, `ends` the cumulative
	/// pair counts of its rings/lines:
	/// - points: one `MoveTo(n)` covering every pair;
	/// - lines: `MoveTo(1)` + `LineTo(n-1)` per line with at least 2 pairs;
	/// - polygons: `MoveTo(1)` + `LineTo(k)` + `ClosePath(1)` per ring,
	///   where `k` skips the duplicate closing vertex of an explicitly
	///   closed ring; rings with fewer than two interior edges are dropped.
	pub fn from_tile_coords(
		id: Option<u64>,
		tag_ids: Vec<u32>,
		geom_type: GeomType,
		coords: &[i32],
		ends: &[usize],
	) -> Result<VectorTileFeature> {
		let mut writer = ValueWriterBlob::<LE>::new_le();
		let mut cursor = (0i64, 0i64);

		let write_point = |writer: &mut ValueWriterBlob<LE>, cursor: &mut (i64, i64), pair: usize| -> Result<()> {
			let x = i64::from(coords[pair * 2]);
			let y = i64::from(coords[pair * 2 + 1]);
			writer.write_svarint(x - cursor.0)?;
			writer.write_svarint(y - cursor.1)?;
			*cursor = (x, y);
			Ok(())
		};

		match geom_type {
			GeomType::Point | GeomType::Unknown => {
				let n = coords.len() / 2;
				if n > 0 {
					writer.write_varint((n as u64) << 3 | CMD_MOVE_TO)?;
					for pair in 0..n {
						write_point(&mut writer, &mut cursor, pair)?;
					}
				}
			}

			GeomType::LineString => {
				let mut start = 0usize;
				for &end in ends {
					let n = end - start;
					if n >= 2 {
						writer.write_varint(1 << 3 | CMD_MOVE_TO)?;
						write_point(&mut writer, &mut cursor, start)?;
						writer.write_varint(((n - 1) as u64) << 3 | CMD_LINE_TO)?;
						for pair in start + 1..end {
							write_point(&mut writer, &mut cursor, pair)?;
						}
					}
					start = end;
				}
			}

			GeomType::Polygon => {
				let mut start = 0usize;
				for &end in ends {
					let n = end - start;
					if n >= 3 {
						let closed = n >= 2
							&& coords[start * 2] == coords[(end - 1) * 2]
							&& coords[start * 2 + 1] == coords[(end - 1) * 2 + 1];
						let k = if closed { n - 2 } else { n - 1 };
						if k >= 2 {
							writer.write_varint(1 << 3 | CMD_MOVE_TO)?;
							write_point(&mut writer, &mut cursor, start)?;
							writer.write_varint((k as u64) << 3 | CMD_LINE_TO)?;
							for pair in start + 1..=start + k {
								write_point(&mut writer, &mut cursor, pair)?;
							}
							writer.write_varint(CMD_CLOSE_PATH | 1 << 3)?;
						}
					}
					start = end;
				}
			}
		}

		Ok(VectorTileFeature {
			id,
			tag_ids,
			geom_type,
			geom_data: writer.into_blob(),
		})
	}

	/// Decodes the raw command/parameter integer stream.
	pub fn geometry_commands(&self) -> Result<Vec<u32>> {
		let mut reader = ValueReaderSlice::new_le(self.geom_data.as_slice());
		let mut commands = Vec::new();
		while reader.has_remaining() {
			commands.push(reader.read_varint().context("failed to read geometry varint")? as u32);
		}
		Ok(commands)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn single_point() -> Result<()> {
		let feature = VectorTileFeature::from_tile_coords(Some(1), vec![], GeomType::Point, &[25, 17], &[1])?;
		// MoveTo(1), zigzag(25)=50, zigzag(17)=34
		assert_eq!(feature.geometry_commands()?, vec![9, 50, 34]);
		assert_eq!(feature.id, Some(1));
		Ok(())
	}

	#[test]
	fn multi_point_uses_one_move_to() -> Result<()> {
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::Point, &[5, 7, 3, 2], &[2])?;
		// MoveTo(2), then deltas (5,7) and (-2,-5)
		assert_eq!(feature.geometry_commands()?, vec![17, 10, 14, 3, 9]);
		Ok(())
	}

	#[test]
	fn line_string() -> Result<()> {
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::LineString, &[2, 2, 2, 10, 10, 10], &[3])?;
		// MoveTo(1) (2,2); LineTo(2) (0,8) (8,0)
		assert_eq!(feature.geometry_commands()?, vec![9, 4, 4, 18, 0, 16, 16, 0]);
		Ok(())
	}

	#[test]
	fn closed_triangle_command_stream() -> Result<()> {
		// ring (0,0) (10,0) (10,10) (0,0), explicitly closed
		let coords = [0, 0, 10, 0, 10, 10, 0, 0];
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::Polygon, &coords, &[4])?;
		assert_eq!(feature.geometry_commands()?, vec![9, 0, 0, 18, 20, 0, 0, 20, 15]);
		Ok(())
	}

	#[test]
	fn open_ring_gets_full_line_to() -> Result<()> {
		// same triangle without the closing vertex
		let coords = [0, 0, 10, 0, 10, 10];
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::Polygon, &coords, &[3])?;
		assert_eq!(feature.geometry_commands()?, vec![9, 0, 0, 18, 20, 0, 0, 20, 15]);
		Ok(())
	}

	#[test]
	fn degenerate_rings_are_dropped() -> Result<()> {
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::Polygon, &[0, 0, 10, 0], &[2])?;
		assert!(feature.geom_data.is_empty());
		Ok(())
	}

	#[test]
	fn cursor_persists_across_rings() -> Result<()> {
		let coords = [0, 0, 10, 0, 10, 10, 0, 0, 100, 100, 110, 100, 110, 110, 100, 100];
		let feature = VectorTileFeature::from_tile_coords(None, vec![], GeomType::Polygon, &coords, &[4, 8])?;
		let commands = feature.geometry_commands()?;
		// second ring starts with MoveTo(1) relative to (10,10): delta (90,90)
		assert_eq!(&commands[9..12], &[9, 180, 180]);
		Ok(())
	}

	#[test]
	fn feature_message_round_trip() -> Result<()> {
		let feature =
			VectorTileFeature::from_tile_coords(Some(42), vec![0, 0, 1, 1], GeomType::LineString, &[0, 0, 5, 5], &[2])?;
		let blob = feature.to_blob()?;
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		let decoded = VectorTileFeature::read(&mut reader)?;
		assert_eq!(decoded, feature);
		Ok(())
	}
}
