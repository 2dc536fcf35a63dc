//! Packed Hilbert R-tree queries.
//!
//! Nodes are 40 bytes (`4 x f64` bbox, `u64` offset) laid out root-first:
//! the lowest array indices hold the root level, leaves occupy the highest.
//! Leaf offsets are feature byte offsets relative to the feature section;
//! internal offsets are the node index of the first child.
//!
//! The query walks an explicit stack, collects matching leaves in ascending
//! order and converts them into absolute byte ranges, merging neighbors
//! whose gap does not exceed [`MERGE_GAP`] — a small over-fetch traded for
//! fewer round trips, which dominate remote-store throughput.

use crate::header::{INDEX_NODE_SIZE, packed_index_level_bounds};
use fgbtiles_core::{ByteRange, GeoBBox};
use anyhow::{Result, ensure};
use itertools::Itertools;
use log::debug;

/// Two ranges merge when the second starts within this many bytes past the
/// end of the first.
pub const MERGE_GAP: u64 = 512;

/// Conservative length bound for the final matching leaf, whose successor
/// lies beyond the dataset. The reader tolerates the over-fetch; a feature
/// larger than this is read truncated.
pub const FEATURE_TAIL_CAP: u64 = 1024 * 1024;

/// Queries the index for all features intersecting `bbox` and returns the
/// sorted, merged absolute byte ranges to fetch.
pub fn query_index(
	index: &[u8],
	bbox: &GeoBBox,
	features_count: u64,
	node_size: u16,
	features_offset: u64,
) -> Result<Vec<ByteRange>> {
	if features_count == 0 || node_size == 0 {
		return Ok(Vec::new());
	}

	let level_bounds = packed_index_level_bounds(features_count, node_size);
	let num_levels = level_bounds.len();
	let total_nodes = level_bounds[0].1;
	ensure!(
		index.len() as u64 >= total_nodes * INDEX_NODE_SIZE,
		"malformed index: buffer holds {} bytes but {total_nodes} nodes need {}",
		index.len(),
		total_nodes * INDEX_NODE_SIZE
	);

	let node_f64 = |node: u64, slot: usize| -> f64 {
		let pos = (node * INDEX_NODE_SIZE) as usize + slot * 8;
		f64::from_le_bytes(index[pos..pos + 8].try_into().unwrap())
	};
	let node_offset = |node: u64| -> u64 {
		let pos = (node * INDEX_NODE_SIZE) as usize + 32;
		u64::from_le_bytes(index[pos..pos + 8].try_into().unwrap())
	};

	let root_level = num_levels - 1;
	let mut stack: Vec<(u64, usize)> = (level_bounds[root_level].0..level_bounds[root_level].1)
		.map(|idx| (idx, root_level))
		.collect();
	let mut matches: Vec<u64> = Vec::new();

	while let Some((idx, level)) = stack.pop() {
		if (idx + 1) * INDEX_NODE_SIZE > index.len() as u64 {
			break;
		}

		let disjoint = node_f64(idx, 2) < bbox.x_min
			|| node_f64(idx, 0) > bbox.x_max
			|| node_f64(idx, 3) < bbox.y_min
			|| node_f64(idx, 1) > bbox.y_max;
		if disjoint {
			continue;
		}

		if level == 0 {
			matches.push(idx);
		} else {
			let first_child = node_offset(idx);
			let last_child = (first_child + u64::from(node_size)).min(level_bounds[level - 1].1);
			for child in first_child..last_child {
				stack.push((child, level - 1));
			}
		}
	}

	matches.sort_unstable();

	let leaf_end = level_bounds[0].1;
	let mut ranges = Vec::with_capacity(matches.len());
	let mut previous_offset: Option<u64> = None;
	for &leaf in &matches {
		let offset = node_offset(leaf);
		if let Some(previous) = previous_offset {
			ensure!(
				offset > previous,
				"malformed index: leaf feature offsets are not monotone"
			);
		}
		previous_offset = Some(offset);

		let length = if leaf + 1 < leaf_end {
			let next = node_offset(leaf + 1);
			ensure!(next >= offset, "malformed index: leaf feature offsets are not monotone");
			next - offset
		} else {
			FEATURE_TAIL_CAP
		};
		ranges.push(ByteRange::new(features_offset + offset, length));
	}

	let merged: Vec<ByteRange> = ranges
		.into_iter()
		.coalesce(|previous, current| {
			if current.offset <= previous.end() + MERGE_GAP {
				Ok(ByteRange::new(
					previous.offset,
					current.end().max(previous.end()) - previous.offset,
				))
			} else {
				Err((previous, current))
			}
		})
		.collect();

	debug!(
		"index query matched {} leaves, merged into {} ranges",
		matches.len(),
		merged.len()
	);
	Ok(merged)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::build_index;

	fn unit_boxes(n: u32, spacing: f64) -> Vec<(GeoBBox, u64)> {
		(0..n)
			.map(|i| {
				let x = f64::from(i) * spacing;
				(GeoBBox::new(x, 0.0, x + 1.0, 1.0).unwrap(), u64::from(i) * 1000)
			})
			.collect()
	}

	#[test]
	fn empty_dataset_matches_nothing() -> Result<()> {
		let bbox = GeoBBox::new(0.0, 0.0, 1.0, 1.0)?;
		assert!(query_index(&[], &bbox, 0, 16, 100)?.is_empty());
		assert!(query_index(&[], &bbox, 5, 0, 100)?.is_empty());
		Ok(())
	}

	#[test]
	fn disjoint_query_matches_nothing() -> Result<()> {
		let index = build_index(&unit_boxes(8, 10.0), 4);
		let bbox = GeoBBox::new(500.0, 500.0, 501.0, 501.0)?;
		assert!(query_index(&index, &bbox, 8, 4, 0)?.is_empty());
		Ok(())
	}

	#[test]
	fn single_match_produces_exact_range() -> Result<()> {
		// features spaced far apart so nothing merges
		let index = build_index(&unit_boxes(8, 10.0), 4);
		let bbox = GeoBBox::new(20.2, 0.2, 20.8, 0.8)?;
		let ranges = query_index(&index, &bbox, 8, 4, 5000)?;
		assert_eq!(ranges, vec![ByteRange::new(5000 + 2000, 1000)]);
		Ok(())
	}

	#[test]
	fn final_leaf_uses_tail_cap() -> Result<()> {
		let index = build_index(&unit_boxes(8, 10.0), 4);
		let bbox = GeoBBox::new(70.0, 0.0, 71.0, 1.0)?;
		let ranges = query_index(&index, &bbox, 8, 4, 0)?;
		assert_eq!(ranges, vec![ByteRange::new(7000, FEATURE_TAIL_CAP)]);
		Ok(())
	}

	#[test]
	fn adjacent_matches_merge() -> Result<()> {
		// consecutive features are 1000 bytes apart with no gap: one range
		let index = build_index(&unit_boxes(8, 10.0), 4);
		let bbox = GeoBBox::new(0.0, 0.0, 31.0, 1.0)?;
		let ranges = query_index(&index, &bbox, 8, 4, 0)?;
		assert_eq!(ranges, vec![ByteRange::new(0, 4000)]);
		Ok(())
	}

	#[test]
	fn ranges_within_the_gap_merge_distant_ones_do_not() -> Result<()> {
		// leaves 0 and 2 match; the unmatched feature 1 creates a
		// 1000-byte gap, larger than MERGE_GAP, so the ranges stay apart
		let items = vec![
			(GeoBBox::new(0.0, 0.0, 1.0, 1.0).unwrap(), 0),
			(GeoBBox::new(50.0, 0.0, 51.0, 1.0).unwrap(), 1000),
			(GeoBBox::new(0.0, 3.0, 1.0, 4.0).unwrap(), 2000),
		];
		let index = build_index(&items, 16);
		let bbox = GeoBBox::new(0.0, 0.0, 2.0, 5.0)?;
		let ranges = query_index(&index, &bbox, 3, 16, 0)?;
		assert_eq!(
			ranges,
			vec![ByteRange::new(0, 1000), ByteRange::new(2000, FEATURE_TAIL_CAP)]
		);

		// shrink the gap below MERGE_GAP: everything merges
		let items = vec![
			(GeoBBox::new(0.0, 0.0, 1.0, 1.0).unwrap(), 0),
			(GeoBBox::new(50.0, 0.0, 51.0, 1.0).unwrap(), 1000),
			(GeoBBox::new(0.0, 3.0, 1.0, 4.0).unwrap(), 1400),
		];
		let index = build_index(&items, 16);
		let ranges = query_index(&index, &bbox, 3, 16, 0)?;
		assert_eq!(ranges, vec![ByteRange::new(0, 1400 + FEATURE_TAIL_CAP)]);
		Ok(())
	}

	#[test]
	fn merged_ranges_cover_all_inputs_and_keep_their_distance() -> Result<()> {
		let index = build_index(&unit_boxes(40, 3.0), 8);
		let bbox = GeoBBox::new(0.0, 0.0, 1000.0, 1.0)?;
		let ranges = query_index(&index, &bbox, 40, 8, 0)?;
		// full coverage of every matched feature span
		assert_eq!(ranges.first().unwrap().offset, 0);
		for pair in ranges.windows(2) {
			assert!(pair[1].offset > pair[0].end() + MERGE_GAP);
		}
		Ok(())
	}

	#[test]
	fn truncated_index_fails() {
		let index = build_index(&unit_boxes(8, 10.0), 4);
		let bbox = GeoBBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
		assert!(query_index(&index[0..index.len() - 40], &bbox, 8, 4, 0).is_err());
	}

	#[test]
	fn non_monotone_leaf_offsets_fail() {
		let mut index = build_index(&unit_boxes(4, 10.0), 16);
		// swap the offsets of leaves 0 and 1 (single root at node 0,
		// leaves at nodes 1..5)
		let leaf0 = 40 + 32;
		let leaf1 = 80 + 32;
		let mut offset0 = [0u8; 8];
		offset0.copy_from_slice(&index[leaf0..leaf0 + 8]);
		let mut offset1 = [0u8; 8];
		offset1.copy_from_slice(&index[leaf1..leaf1 + 8]);
		index[leaf0..leaf0 + 8].copy_from_slice(&offset1);
		index[leaf1..leaf1 + 8].copy_from_slice(&offset0);

		let bbox = GeoBBox::new(0.0, 0.0, 100.0, 1.0).unwrap();
		assert!(query_index(&index, &bbox, 4, 16, 0).is_err());
	}
}
