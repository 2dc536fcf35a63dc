//! PBF codec for `Tile.Value` messages.
//!
//! The writer emits string, double, uint (field 5), sint (field 6) and bool
//! values; the reader additionally accepts float and plain int64 fields for
//! compatibility with third-party encoders.

use crate::geo::GeoValue;
use fgbtiles_core::{
	Blob,
	io::{ValueReader, ValueWriter, ValueWriterBlob},
};
use anyhow::{Context, Result, anyhow, bail};
use byteorder::LE;

pub trait GeoValuePBF<'a> {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue>;
	fn to_blob(&self) -> Result<Blob>;
}

impl<'a> GeoValuePBF<'a> for GeoValue {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue> {
		use GeoValue::*;
		let mut value: Option<GeoValue> = None;

		while reader.has_remaining() {
			value = Some(match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 2) => String(reader.read_pbf_string().context("failed to read string value")?),
				(2, 5) => Double(f64::from(reader.read_f32().context("failed to read float value")?)),
				(3, 1) => Double(reader.read_f64().context("failed to read double value")?),
				(4, 0) => Int(reader.read_varint().context("failed to read int value")? as i64),
				(5, 0) => UInt(reader.read_varint().context("failed to read uint value")?),
				(6, 0) => Int(reader.read_svarint().context("failed to read sint value")?),
				(7, 0) => Bool(reader.read_varint().context("failed to read bool value")? != 0),
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			});
		}
		value.ok_or_else(|| anyhow!("empty value message"))
	}

	fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		match self {
			GeoValue::String(s) => {
				writer.write_pbf_key(1, 2)?;
				writer.write_pbf_string(s)?;
			}
			GeoValue::Double(v) => {
				writer.write_pbf_key(3, 1)?;
				writer.write_f64(*v)?;
			}
			GeoValue::UInt(v) => {
				writer.write_pbf_key(5, 0)?;
				writer.write_varint(*v)?;
			}
			GeoValue::Int(v) => {
				writer.write_pbf_key(6, 0)?;
				writer.write_svarint(*v)?;
			}
			GeoValue::Bool(v) => {
				writer.write_pbf_key(7, 0)?;
				writer.write_varint(u64::from(*v))?;
			}
			GeoValue::Null | GeoValue::Binary(_) => {
				bail!("{self:?} is not representable as an MVT value")
			}
		}

		Ok(writer.into_blob())
	}
}
