//! Stage 3: Douglas–Peucker simplification in Mercator unit space.
//!
//! A single pass assigns every vertex an importance score — the maximum
//! squared distance to the chord of the range that selected it — and the
//! filter keeps vertices whose score exceeds the squared tolerance. Ring
//! endpoints are pinned with infinite importance.

use super::{RingBuffer, remap_parts, ring_ranges};
use fgbtiles_core::GeoBBox;

/// Simplifies every ring of a feature.
///
/// Points must not be passed here; the caller skips this stage for point
/// geometries and when the tolerance is zero.
///
/// For polygons, rings whose bounding-box area falls below the squared
/// tolerance are dropped entirely, and `parts` is rebuilt over the
/// survivors. Returns `None` when no ring survives.
pub fn simplify_feature(buffer: RingBuffer, sq_tolerance: f64, is_polygon: bool) -> Option<RingBuffer> {
	let ring_count = buffer.ends.len();
	let mut new_index: Vec<Option<usize>> = vec![None; ring_count];
	let mut out_xy = Vec::new();
	let mut out_ends = Vec::new();

	for (i, (start, end)) in ring_ranges(&buffer.ends).enumerate() {
		let ring = &buffer.xy[start * 2..end * 2];

		if is_polygon && GeoBBox::from_flat_coords(ring).area() < sq_tolerance {
			continue;
		}

		let kept = simplify_ring(ring, sq_tolerance);
		if kept.len() < 4 {
			// collapsed below two vertices
			continue;
		}
		new_index[i] = Some(out_ends.len());
		out_xy.extend_from_slice(&kept);
		out_ends.push(out_xy.len() / 2);
	}

	if out_ends.is_empty() {
		return None;
	}
	let parts = buffer
		.parts
		.and_then(|p| remap_parts(&p, ring_count, &new_index));
	Some(RingBuffer {
		xy: out_xy,
		ends: out_ends,
		parts,
	})
}

/// Runs the importance pass over one ring and keeps vertices scoring above
/// `sq_tolerance`.
fn simplify_ring(ring: &[f64], sq_tolerance: f64) -> Vec<f64> {
	let n = ring.len() / 2;
	if n <= 2 {
		return ring.to_vec();
	}

	let mut scores = vec![0.0f64; n];
	scores[0] = f64::INFINITY;
	scores[n - 1] = f64::INFINITY;

	let mut stack = vec![(0usize, n - 1)];
	while let Some((first, last)) = stack.pop() {
		if last <= first + 1 {
			continue;
		}
		let mid = (first + last) / 2;
		let mut max_index = first + 1;
		let mut max_sq_dist = sq_segment_dist(ring, max_index, first, last);

		for p in first + 2..last {
			let sq_dist = sq_segment_dist(ring, p, first, last);
			// ties prefer the index closest to the range midpoint, keeping
			// the recursion balanced
			if sq_dist > max_sq_dist || (sq_dist == max_sq_dist && p.abs_diff(mid) < max_index.abs_diff(mid)) {
				max_sq_dist = sq_dist;
				max_index = p;
			}
		}

		scores[max_index] = max_sq_dist;
		stack.push((first, max_index));
		stack.push((max_index, last));
	}

	let mut out = Vec::with_capacity(ring.len());
	for (p, &score) in scores.iter().enumerate() {
		if score > sq_tolerance {
			out.push(ring[p * 2]);
			out.push(ring[p * 2 + 1]);
		}
	}
	out
}

/// Squared distance from point `p` to the segment `first -> last`, with the
/// closest-point parameter clamped to the segment.
fn sq_segment_dist(ring: &[f64], p: usize, first: usize, last: usize) -> f64 {
	let (px, py) = (ring[p * 2], ring[p * 2 + 1]);
	let (ax, ay) = (ring[first * 2], ring[first * 2 + 1]);
	let (bx, by) = (ring[last * 2], ring[last * 2 + 1]);

	let dx = bx - ax;
	let dy = by - ay;
	let (cx, cy) = if dx == 0.0 && dy == 0.0 {
		(ax, ay)
	} else {
		let t = (((px - ax) * dx + (py - ay) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
		(ax + dx * t, ay + dy * t)
	};

	let ex = px - cx;
	let ey = py - cy;
	ex * ex + ey * ey
}
