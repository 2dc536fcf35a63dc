//! Deduplicated key/value tables for one vector tile layer.
//!
//! Keys and values are interned on first use and addressed by their slot
//! index from feature tag lists. Two values share a slot exactly when their
//! variant tags and contents coincide.

use crate::geo::{GeoProperties, GeoValue};
use anyhow::{Result, anyhow, ensure};
use std::{collections::HashMap, fmt::Debug, hash::Hash};

/// An insertion-ordered interning table.
#[derive(Clone, PartialEq)]
pub struct DedupTable<T>
where
	T: Clone + Eq + Hash,
{
	list: Vec<T>,
	index: HashMap<T, u32>,
}

impl<T> DedupTable<T>
where
	T: Clone + Debug + Eq + Hash,
{
	pub fn new() -> DedupTable<T> {
		DedupTable {
			list: Vec::new(),
			index: HashMap::new(),
		}
	}

	/// Returns the slot of `entry`, interning it on first sight.
	pub fn add(&mut self, entry: T) -> u32 {
		if let Some(index) = self.index.get(&entry) {
			return *index;
		}
		let index = self.list.len() as u32;
		self.index.insert(entry.clone(), index);
		self.list.push(entry);
		index
	}

	pub fn get(&self, id: u32) -> Result<&T> {
		self
			.list
			.get(id as usize)
			.ok_or_else(|| anyhow!("slot {id} not found"))
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.list.iter()
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	#[must_use]
	pub fn as_slice(&self) -> &[T] {
		&self.list
	}
}

impl<T: Clone + Debug + Eq + Hash> Default for DedupTable<T> {
	fn default() -> DedupTable<T> {
		DedupTable::new()
	}
}

impl<T> Debug for DedupTable<T>
where
	T: Clone + Debug + Eq + Hash,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(&self.list).finish()
	}
}

/// The key and value tables of one layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyManager {
	pub keys: DedupTable<String>,
	pub values: DedupTable<GeoValue>,
}

impl PropertyManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_key(&mut self, key: String) -> u32 {
		self.keys.add(key)
	}

	pub fn add_val(&mut self, value: GeoValue) -> u32 {
		self.values.add(value)
	}

	pub fn iter_keys(&self) -> impl Iterator<Item = &String> + '_ {
		self.keys.iter()
	}

	pub fn iter_vals(&self) -> impl Iterator<Item = &GeoValue> + '_ {
		self.values.iter()
	}

	/// Resolves a feature tag list back into a property map.
	pub fn decode_tag_ids(&self, tag_ids: &[u32]) -> Result<GeoProperties> {
		ensure!(tag_ids.len() % 2 == 0, "tag list length must be even");
		let mut properties = GeoProperties::new();
		for pair in tag_ids.chunks_exact(2) {
			properties.insert(self.keys.get(pair[0])?.clone(), self.values.get(pair[1])?.clone());
		}
		Ok(properties)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_deduplicates() {
		let mut table = DedupTable::new();
		assert_eq!(table.add("a".to_string()), 0);
		assert_eq!(table.add("b".to_string()), 1);
		assert_eq!(table.add("a".to_string()), 0);
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn value_slots_distinguish_variants() {
		let mut manager = PropertyManager::new();
		let a = manager.add_val(GeoValue::UInt(1));
		let b = manager.add_val(GeoValue::String("1".to_string()));
		let c = manager.add_val(GeoValue::UInt(1));
		assert_ne!(a, b);
		assert_eq!(a, c);
	}

	#[test]
	fn no_duplicate_entries_after_interning() {
		let mut manager = PropertyManager::new();
		for _ in 0..3 {
			manager.add_key("name".to_string());
			manager.add_val(GeoValue::from("Berlin"));
			manager.add_val(GeoValue::from(42u64));
		}
		assert_eq!(manager.keys.len(), 1);
		assert_eq!(manager.values.len(), 2);
	}

	#[test]
	fn decode_tag_ids() -> Result<()> {
		let mut manager = PropertyManager::new();
		let k = manager.add_key("key".to_string());
		let v = manager.add_val(GeoValue::from("value"));
		let properties = manager.decode_tag_ids(&[k, v])?;
		assert_eq!(properties.get("key"), Some(&GeoValue::from("value")));
		assert!(manager.decode_tag_ids(&[k]).is_err());
		assert!(manager.decode_tag_ids(&[9, 9]).is_err());
		Ok(())
	}
}
