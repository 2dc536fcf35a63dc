//! Typed property values decoded from FlatGeobuf column streams.
//!
//! [`GeoValue`] is a small sum type covering every value the FlatGeobuf
//! property encoding can carry. `Eq` and `Hash` are implemented so values can
//! serve as dedup-table keys: two values coincide exactly when their variant
//! tags and canonical contents coincide, so the unsigned `1` and the string
//! `"1"` occupy distinct slots.

use std::fmt::Debug;
use std::hash::Hash;

/// A typed feature property value.
#[derive(Clone, PartialEq)]
pub enum GeoValue {
	/// Raw bytes from a `Binary` column; filtered before MVT encoding.
	Binary(Vec<u8>),
	Bool(bool),
	Double(f64),
	Int(i64),
	/// Explicit null; filtered before MVT encoding.
	Null,
	String(String),
	UInt(u64),
}

impl GeoValue {
	/// Converts this value into the variant the MVT value table stores, or
	/// `None` when the value is not representable (`Null`, `Binary`).
	///
	/// Integer-valued doubles are reclassified: non-negative ones become
	/// unsigned, negative ones signed; everything else stays a double.
	#[must_use]
	pub fn into_mvt_value(self) -> Option<GeoValue> {
		match self {
			GeoValue::Null | GeoValue::Binary(_) => None,
			GeoValue::Double(v) if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 => {
				Some(GeoValue::UInt(v as u64))
			}
			GeoValue::Double(v) if v.fract() == 0.0 && v < 0.0 && v >= i64::MIN as f64 => {
				Some(GeoValue::Int(v as i64))
			}
			other => Some(other),
		}
	}
}

impl Debug for GeoValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Binary(v) => f.debug_tuple("Binary").field(&v.len()).finish(),
			Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
			Self::Double(v) => f.debug_tuple("Double").field(v).finish(),
			Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
			Self::Null => f.debug_tuple("Null").finish(),
			Self::String(v) => f.debug_tuple("String").field(v).finish(),
			Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
		}
	}
}

impl Eq for GeoValue {}

impl Hash for GeoValue {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		core::mem::discriminant(self).hash(state);
		match self {
			Self::Binary(v) => v.hash(state),
			Self::Bool(v) => v.hash(state),
			Self::Double(v) => v.to_bits().hash(state),
			Self::Int(v) => v.hash(state),
			Self::Null => {}
			Self::String(v) => v.hash(state),
			Self::UInt(v) => v.hash(state),
		}
	}
}

impl From<&str> for GeoValue {
	fn from(value: &str) -> Self {
		GeoValue::String(value.to_string())
	}
}

impl From<String> for GeoValue {
	fn from(value: String) -> Self {
		GeoValue::String(value)
	}
}

impl From<i64> for GeoValue {
	fn from(value: i64) -> Self {
		GeoValue::Int(value)
	}
}

impl From<u64> for GeoValue {
	fn from(value: u64) -> Self {
		GeoValue::UInt(value)
	}
}

impl From<u32> for GeoValue {
	fn from(value: u32) -> Self {
		GeoValue::UInt(u64::from(value))
	}
}

impl From<f64> for GeoValue {
	fn from(value: f64) -> Self {
		GeoValue::Double(value)
	}
}

impl From<bool> for GeoValue {
	fn from(value: bool) -> Self {
		GeoValue::Bool(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn mvt_number_classification() {
		assert_eq!(GeoValue::Double(3.0).into_mvt_value(), Some(GeoValue::UInt(3)));
		assert_eq!(GeoValue::Double(0.0).into_mvt_value(), Some(GeoValue::UInt(0)));
		assert_eq!(GeoValue::Double(-3.0).into_mvt_value(), Some(GeoValue::Int(-3)));
		assert_eq!(GeoValue::Double(3.5).into_mvt_value(), Some(GeoValue::Double(3.5)));
		assert_eq!(GeoValue::Int(-7).into_mvt_value(), Some(GeoValue::Int(-7)));
	}

	#[test]
	fn null_and_binary_are_filtered() {
		assert_eq!(GeoValue::Null.into_mvt_value(), None);
		assert_eq!(GeoValue::Binary(vec![1, 2]).into_mvt_value(), None);
	}

	#[test]
	fn distinct_variants_hash_into_distinct_slots() {
		let mut set = HashSet::new();
		assert!(set.insert(GeoValue::UInt(1)));
		assert!(set.insert(GeoValue::String("1".to_string())));
		assert!(set.insert(GeoValue::Bool(true)));
		assert!(!set.insert(GeoValue::UInt(1)));
	}

	#[test]
	fn from_impls() {
		assert_eq!(GeoValue::from("x"), GeoValue::String("x".to_string()));
		assert_eq!(GeoValue::from(5u64), GeoValue::UInt(5));
		assert_eq!(GeoValue::from(-5i64), GeoValue::Int(-5));
		assert_eq!(GeoValue::from(true), GeoValue::Bool(true));
	}
}
