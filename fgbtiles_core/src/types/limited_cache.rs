//! This module provides a generic size-bounded cache used for parsed
//! FlatGeobuf headers and their index bytes.
//!
//! The cache behaves like an LRU: it never exceeds a number of elements
//! derived from the byte-size limit, and least-recently accessed entries are
//! evicted first.

use anyhow::{Context, Result};
use lru::LruCache;
use std::{fmt::Debug, hash::Hash, mem::size_of, num::NonZeroUsize};

/// A key-value cache bounded by an approximate total byte size.
///
/// The element budget is derived from `size_of::<(K, V)>()`; values holding
/// heap data (e.g. `Arc`ed header entries) should choose the limit
/// accordingly.
pub struct LimitedCache<K, V> {
	cache: LruCache<K, V>,
}

impl<K, V> LimitedCache<K, V>
where
	K: Clone + Debug + Eq + Hash + PartialEq,
	V: Clone,
{
	/// Creates a cache with the given maximum byte size.
	///
	/// # Panics
	/// Panics if `maximum_size` cannot hold a single `(K, V)` pair.
	#[must_use]
	pub fn with_maximum_size(maximum_size: usize) -> Self {
		let per_element_size = size_of::<K>() + size_of::<V>();
		let max_length = maximum_size / per_element_size;
		assert!(
			max_length > 0,
			"size ({maximum_size} bytes) is too small to store a single element of size {per_element_size} bytes"
		);

		Self {
			cache: LruCache::new(NonZeroUsize::new(max_length).unwrap()),
		}
	}

	/// Returns a clone of the cached value, marking it most recently used.
	pub fn get(&mut self, key: &K) -> Option<V> {
		self.cache.get(key).cloned()
	}

	/// Returns the cached value, or computes, stores and returns it.
	pub fn get_or_set<F>(&mut self, key: &K, callback: F) -> Result<V>
	where
		F: FnOnce() -> Result<V>,
	{
		if let Some(cached) = self.get(key) {
			return Ok(cached);
		}

		let value = callback().with_context(|| format!("while computing cache value for key '{key:?}'"))?;
		Ok(self.add(key.clone(), value))
	}

	/// Inserts `key -> value`, evicting the least recently used entry when at
	/// capacity, and returns the inserted value.
	pub fn add(&mut self, key: K, value: V) -> V {
		let cloned_value = value.clone();
		self.cache.put(key, value);
		cloned_value
	}

	pub fn len(&self) -> usize {
		self.cache.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.cache.cap().get()
	}
}

impl<K, V> Debug for LimitedCache<K, V>
where
	K: Clone + Debug + Eq + Hash + PartialEq,
	V: Clone,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LimitedCache")
			.field("length", &self.len())
			.field("max_length", &self.capacity())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::LimitedCache;
	use anyhow::{Result, anyhow};
	use std::mem::size_of;

	#[test]
	fn capacity_derived_from_byte_size() {
		let element_size = size_of::<u64>() + size_of::<i32>();
		let cache: LimitedCache<u64, i32> = LimitedCache::with_maximum_size(100);
		assert_eq!(cache.capacity(), 100 / element_size);
	}

	#[test]
	fn add_and_get() {
		let mut cache = LimitedCache::with_maximum_size(10 * 2 * size_of::<i32>());
		cache.add(1, 100);
		cache.add(2, 200);
		assert_eq!(cache.get(&1), Some(100));
		assert_eq!(cache.get(&2), Some(200));
		assert_eq!(cache.get(&3), None);
	}

	#[test]
	fn get_or_set_only_computes_once() -> Result<()> {
		let mut cache = LimitedCache::with_maximum_size(10 * 2 * size_of::<i32>());
		assert_eq!(cache.get_or_set(&1, || Ok(999))?, 999);
		assert_eq!(cache.get_or_set(&1, || Err(anyhow!("must not be called")))?, 999);
		Ok(())
	}

	#[test]
	fn lru_eviction() {
		let mut cache: LimitedCache<u64, u64> = LimitedCache::with_maximum_size(3 * 2 * size_of::<u64>());
		cache.add(1, 100);
		cache.add(2, 200);
		cache.add(3, 300);
		let _ = cache.get(&1);
		cache.add(4, 400);

		assert_eq!(cache.get(&1), Some(100));
		assert_eq!(cache.get(&2), None);
		assert_eq!(cache.get(&3), Some(300));
		assert_eq!(cache.get(&4), Some(400));
	}

	#[test]
	#[should_panic(expected = "size")]
	fn creation_too_small() {
		let _cache: LimitedCache<u8, u8> = LimitedCache::with_maximum_size(1);
	}
}
