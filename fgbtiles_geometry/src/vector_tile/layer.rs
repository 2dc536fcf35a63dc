//! `Tile.Layer` messages.
//!
//! A layer carries its name, extent, feature list and the deduplicated
//! key/value tables the features' tag lists index into. The writer always
//! emits `version = 2` (MVT 2.1); an empty layer serializes to a minimal
//! message with name, extent and version only.

use super::{
	feature::VectorTileFeature,
	property_manager::PropertyManager,
	value::GeoValuePBF,
};
use crate::geo::{GeoProperties, GeoValue};
use fgbtiles_core::{
	Blob,
	io::{ValueReader, ValueWriter, ValueWriterBlob},
};
use anyhow::{Context, Result, anyhow, bail};
use byteorder::LE;

pub const DEFAULT_EXTENT: u32 = 4096;
pub const MVT_VERSION: u32 = 2;

#[derive(Debug, Default, PartialEq)]
pub struct VectorTileLayer {
	pub extent: u32,
	pub features: Vec<VectorTileFeature>,
	pub name: String,
	pub property_manager: PropertyManager,
	pub version: u32,
}

impl VectorTileLayer {
	/// Creates an empty layer with the given name and extent.
	pub fn new(name: String, extent: u32) -> VectorTileLayer {
		VectorTileLayer {
			extent,
			features: vec![],
			name,
			property_manager: PropertyManager::new(),
			version: MVT_VERSION,
		}
	}

	/// Decodes a layer message.
	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileLayer> {
		let mut extent = DEFAULT_EXTENT;
		let mut features: Vec<VectorTileFeature> = Vec::new();
		let mut name = None;
		let mut property_manager = PropertyManager::new();
		let mut version = 1;

		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 2) => name = Some(reader.read_pbf_string().context("failed to read layer name")?),
				(2, 2) => features.push(
					VectorTileFeature::read(
						reader
							.get_pbf_sub_reader()
							.context("failed to get sub-reader for feature")?
							.as_mut(),
					)
					.context("failed to read feature")?,
				),
				(3, 2) => {
					property_manager.add_key(reader.read_pbf_string().context("failed to read property key")?);
				}
				(4, 2) => {
					property_manager.add_val(
						GeoValue::read(
							reader
								.get_pbf_sub_reader()
								.context("failed to get sub-reader for property value")?
								.as_mut(),
						)
						.context("failed to read property value")?,
					);
				}
				(5, 0) => extent = reader.read_varint().context("failed to read extent")? as u32,
				(15, 0) => version = reader.read_varint().context("failed to read version")? as u32,
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		Ok(VectorTileLayer {
			extent,
			features,
			name: name.ok_or_else(|| anyhow!("layer name is required"))?,
			property_manager,
			version,
		})
	}

	/// Serializes the layer message.
	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string(&self.name)?;

		for feature in &self.features {
			writer.write_pbf_key(2, 2)?;
			writer
				.write_pbf_blob(&feature.to_blob().context("failed to serialize feature")?)
				.context("failed to write feature")?;
		}

		for key in self.property_manager.iter_keys() {
			writer.write_pbf_key(3, 2)?;
			writer.write_pbf_string(key)?;
		}

		for value in self.property_manager.iter_vals() {
			writer.write_pbf_key(4, 2)?;
			writer
				.write_pbf_blob(&value.to_blob().context("failed to serialize property value")?)
				.context("failed to write property value")?;
		}

		writer.write_pbf_key(5, 0)?;
		writer.write_varint(u64::from(self.extent))?;

		writer.write_pbf_key(15, 0)?;
		writer.write_varint(u64::from(self.version))?;

		Ok(writer.into_blob())
	}

	/// Resolves a feature's tag list against this layer's tables.
	pub fn decode_feature_properties(&self, feature: &VectorTileFeature) -> Result<GeoProperties> {
		self.property_manager.decode_tag_ids(&feature.tag_ids)
	}
}
