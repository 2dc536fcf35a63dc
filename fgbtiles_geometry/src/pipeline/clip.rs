//! Stage 2: Sutherland–Hodgman clipping against a buffered tile rectangle.
//!
//! Clipping runs as two axis-slab passes, x first, then y, so every emitted
//! intersection point already lies within the previously clipped axis.
//! Lines may split into multiple output lines when they leave and re-enter
//! the slab; polygon rings accumulate into a single re-closed ring.

use super::{RingBuffer, remap_parts, ring_ranges};
use crate::geo::GeometryKind;
use fgbtiles_core::GeoBBox;

/// Clips a projected feature against `clip`.
///
/// Returns `None` when nothing of the feature survives. When the feature's
/// bounding box lies entirely inside the clip box, the coordinates pass
/// through unchanged.
pub fn clip_feature(
	kind: GeometryKind,
	xy: &[f64],
	ends: &[usize],
	parts: Option<&[usize]>,
	clip: &GeoBBox,
) -> Option<RingBuffer> {
	if xy.is_empty() {
		return None;
	}

	let feature_bbox = GeoBBox::from_flat_coords(xy);
	if !clip.intersects(&feature_bbox) {
		return None;
	}
	if clip.contains_bbox(&feature_bbox) {
		return Some(RingBuffer {
			xy: xy.to_vec(),
			ends: ends.to_vec(),
			parts: parts.map(<[usize]>::to_vec),
		});
	}

	if kind.is_line() {
		clip_lines(xy, ends, clip)
	} else if kind.is_polygon() {
		clip_polygon(xy, ends, parts, clip)
	} else {
		clip_points(xy, clip)
	}
}

/// Keeps every coordinate pair inside the clip box (boundary inclusive).
fn clip_points(xy: &[f64], clip: &GeoBBox) -> Option<RingBuffer> {
	let mut out = Vec::new();
	for pair in xy.chunks_exact(2) {
		if clip.contains_point(pair[0], pair[1]) {
			out.extend_from_slice(pair);
		}
	}
	if out.is_empty() {
		return None;
	}
	let ends = vec![out.len() / 2];
	Some(RingBuffer {
		xy: out,
		ends,
		parts: None,
	})
}

fn clip_lines(xy: &[f64], ends: &[usize], clip: &GeoBBox) -> Option<RingBuffer> {
	let mut slices: Vec<Vec<f64>> = Vec::new();
	for (start, end) in ring_ranges(ends) {
		let line = &xy[start * 2..end * 2];
		for slice_x in clip_line_axis(line, clip.x_min, clip.x_max, 0) {
			slices.extend(clip_line_axis(&slice_x, clip.y_min, clip.y_max, 1));
		}
	}
	slices.retain(|slice| slice.len() >= 4);
	if slices.is_empty() {
		return None;
	}

	let mut out_xy = Vec::new();
	let mut out_ends = Vec::new();
	for slice in slices {
		out_xy.extend_from_slice(&slice);
		out_ends.push(out_xy.len() / 2);
	}
	Some(RingBuffer {
		xy: out_xy,
		ends: out_ends,
		parts: None,
	})
}

fn clip_polygon(xy: &[f64], ends: &[usize], parts: Option<&[usize]>, clip: &GeoBBox) -> Option<RingBuffer> {
	let ring_count = ends.len();
	let mut new_index: Vec<Option<usize>> = vec![None; ring_count];
	let mut out_xy = Vec::new();
	let mut out_ends = Vec::new();

	for (i, (start, end)) in ring_ranges(ends).enumerate() {
		let ring = &xy[start * 2..end * 2];
		let clipped_x = clip_ring_axis(ring, clip.x_min, clip.x_max, 0);
		if clipped_x.len() < 6 {
			continue;
		}
		let clipped = clip_ring_axis(&clipped_x, clip.y_min, clip.y_max, 1);
		if clipped.len() < 8 {
			// fewer than three distinct vertices plus closure
			continue;
		}
		new_index[i] = Some(out_ends.len());
		out_xy.extend_from_slice(&clipped);
		out_ends.push(out_xy.len() / 2);
	}

	if out_ends.is_empty() {
		return None;
	}
	let parts = parts.and_then(|p| remap_parts(p, ring_count, &new_index));
	Some(RingBuffer {
		xy: out_xy,
		ends: out_ends,
		parts,
	})
}

/// Interpolated crossing of segment `a -> b` with the axis constant `k`.
///
/// Finite whenever the segment actually crosses `k`, since then the axis
/// values differ.
fn intersect(a: &[f64], b: &[f64], axis: usize, k: f64) -> [f64; 2] {
	let t = (k - a[axis]) / (b[axis] - a[axis]);
	let other = 1 - axis;
	let mut point = [0.0; 2];
	point[axis] = k;
	point[other] = a[other] + (b[other] - a[other]) * t;
	point
}

/// Clips one open line against the slab `[k1, k2]` on `axis`, emitting zero
/// or more line slices. Leaving the slab closes the current slice; entering
/// it starts a new one.
fn clip_line_axis(line: &[f64], k1: f64, k2: f64, axis: usize) -> Vec<Vec<f64>> {
	let n = line.len() / 2;
	let mut slices = Vec::new();
	let mut slice: Vec<f64> = Vec::new();

	for i in 0..n.saturating_sub(1) {
		let a = &line[i * 2..i * 2 + 2];
		let b = &line[(i + 1) * 2..(i + 1) * 2 + 2];
		let av = a[axis];
		let bv = b[axis];
		let mut exited = false;

		if av < k1 {
			if bv > k2 {
				// straddles the whole slab upward
				slice.extend_from_slice(&intersect(a, b, axis, k1));
				slice.extend_from_slice(&intersect(a, b, axis, k2));
				exited = true;
			} else if bv >= k1 {
				slice.extend_from_slice(&intersect(a, b, axis, k1));
			}
		} else if av > k2 {
			if bv < k1 {
				// straddles the whole slab downward
				slice.extend_from_slice(&intersect(a, b, axis, k2));
				slice.extend_from_slice(&intersect(a, b, axis, k1));
				exited = true;
			} else if bv <= k2 {
				slice.extend_from_slice(&intersect(a, b, axis, k2));
			}
		} else {
			slice.extend_from_slice(a);
			if bv < k1 {
				slice.extend_from_slice(&intersect(a, b, axis, k1));
				exited = true;
			} else if bv > k2 {
				slice.extend_from_slice(&intersect(a, b, axis, k2));
				exited = true;
			}
		}

		if exited && !slice.is_empty() {
			slices.push(std::mem::take(&mut slice));
		}
	}

	if n > 0 {
		let last = &line[(n - 1) * 2..n * 2];
		if last[axis] >= k1 && last[axis] <= k2 {
			slice.extend_from_slice(last);
		}
	}
	if !slice.is_empty() {
		slices.push(slice);
	}
	slices
}

/// Clips one ring against the slab `[k1, k2]` on `axis` in polygon mode:
/// all surviving vertices accumulate into a single ring, which is re-closed.
fn clip_ring_axis(ring: &[f64], k1: f64, k2: f64, axis: usize) -> Vec<f64> {
	let n = ring.len() / 2;
	let mut out: Vec<f64> = Vec::new();

	for i in 0..n.saturating_sub(1) {
		let a = &ring[i * 2..i * 2 + 2];
		let b = &ring[(i + 1) * 2..(i + 1) * 2 + 2];
		let av = a[axis];
		let bv = b[axis];

		if av < k1 {
			if bv > k2 {
				out.extend_from_slice(&intersect(a, b, axis, k1));
				out.extend_from_slice(&intersect(a, b, axis, k2));
			} else if bv >= k1 {
				out.extend_from_slice(&intersect(a, b, axis, k1));
			}
		} else if av > k2 {
			if bv < k1 {
				out.extend_from_slice(&intersect(a, b, axis, k2));
				out.extend_from_slice(&intersect(a, b, axis, k1));
			} else if bv <= k2 {
				out.extend_from_slice(&intersect(a, b, axis, k2));
			}
		} else {
			out.extend_from_slice(a);
			if bv < k1 {
				out.extend_from_slice(&intersect(a, b, axis, k1));
			} else if bv > k2 {
				out.extend_from_slice(&intersect(a, b, axis, k2));
			}
		}
	}

	if n > 0 {
		let last = &ring[(n - 1) * 2..n * 2];
		if last[axis] >= k1 && last[axis] <= k2 {
			out.extend_from_slice(last);
		}
	}

	// re-close
	let m = out.len();
	if m >= 4 && (out[0] != out[m - 2] || out[1] != out[m - 1]) {
		let (x0, y0) = (out[0], out[1]);
		out.push(x0);
		out.push(y0);
	}
	out
}
