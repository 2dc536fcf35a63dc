//! Stage 5: winding correction for polygon rings in tile space.
//!
//! MVT requires clockwise exterior rings and counter-clockwise interior
//! rings in y-down integer coordinates. A positive shoelace sum
//! `sum((x_prev - x_i) * (y_i + y_prev))` means clockwise in that space.

use crate::geo::GeometryKind;

/// Reorients every ring of a polygon feature in place.
///
/// The exterior set is derived from the ring structure:
/// - a single ring is the exterior;
/// - a plain `Polygon` treats ring 0 as exterior and the rest as holes;
/// - a `MultiPolygon` with `parts` treats every listed index as exterior.
pub fn correct_winding(coords: &mut [i32], ends: &[usize], parts: Option<&[usize]>, kind: GeometryKind) {
	if !kind.is_polygon() {
		return;
	}

	let is_exterior = |ring: usize| -> bool {
		match parts {
			Some(parts) if ends.len() > 1 => parts.contains(&ring),
			_ => ring == 0,
		}
	};

	let mut start = 0usize;
	for (ring, &end) in ends.iter().enumerate() {
		let want_clockwise = is_exterior(ring);
		let sum = ring_shoelace(coords, start, end);
		if sum != 0 && (sum > 0) != want_clockwise {
			reverse_ring(coords, start, end);
		}
		start = end;
	}
}

/// Shoelace sum over the pairs `[start, end)`, including the wrap-around
/// edge so open and explicitly closed rings score alike.
pub fn ring_shoelace(coords: &[i32], start: usize, end: usize) -> i64 {
	let n = end - start;
	if n < 2 {
		return 0;
	}
	let x = |p: usize| i64::from(coords[(start + p) * 2]);
	let y = |p: usize| i64::from(coords[(start + p) * 2 + 1]);

	let mut sum = 0i64;
	let mut prev = n - 1;
	for p in 0..n {
		sum += (x(prev) - x(p)) * (y(p) + y(prev));
		prev = p;
	}
	sum
}

fn reverse_ring(coords: &mut [i32], start: usize, end: usize) {
	let n = end - start;
	for k in 0..n / 2 {
		let a = (start + k) * 2;
		let b = (end - 1 - k) * 2;
		coords.swap(a, b);
		coords.swap(a + 1, b + 1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// y-down: (0,0) -> (10,0) -> (10,10) is clockwise on screen
	const CLOCKWISE: [i32; 8] = [0, 0, 10, 0, 10, 10, 0, 10];
	const COUNTER: [i32; 8] = [0, 10, 10, 10, 10, 0, 0, 0];

	#[test]
	fn shoelace_sign() {
		assert!(ring_shoelace(&CLOCKWISE, 0, 4) > 0);
		assert!(ring_shoelace(&COUNTER, 0, 4) < 0);
	}

	#[test]
	fn exterior_ring_is_flipped_to_clockwise() {
		let mut coords = COUNTER.to_vec();
		correct_winding(&mut coords, &[4], None, GeometryKind::Polygon);
		assert!(ring_shoelace(&coords, 0, 4) > 0);
	}

	#[test]
	fn holes_are_flipped_to_counter_clockwise() {
		let mut coords = Vec::new();
		coords.extend_from_slice(&CLOCKWISE); // shell, already correct
		coords.extend_from_slice(&[2, 2, 6, 2, 6, 6, 2, 6]); // hole, clockwise (wrong)
		correct_winding(&mut coords, &[4, 8], None, GeometryKind::Polygon);
		assert!(ring_shoelace(&coords, 0, 4) > 0);
		assert!(ring_shoelace(&coords, 4, 8) < 0);
	}

	#[test]
	fn multipolygon_parts_select_exteriors() {
		let mut coords = Vec::new();
		coords.extend_from_slice(&COUNTER); // polygon 1 shell (wrong)
		coords.extend_from_slice(&[20, 0, 30, 0, 30, 10, 20, 10]); // polygon 2 shell, clockwise
		correct_winding(&mut coords, &[4, 8], Some(&[0, 1]), GeometryKind::MultiPolygon);
		assert!(ring_shoelace(&coords, 0, 4) > 0);
		assert!(ring_shoelace(&coords, 4, 8) > 0);
	}

	#[test]
	fn non_polygons_are_untouched(){
		let mut coords = COUNTER.to_vec();
		correct_winding(&mut coords, &[4], None, GeometryKind::LineString);
		assert_eq!(coords, COUNTER.to_vec());
	}
}
