//! Stage 4: transform from Mercator unit space into integer tile
//! coordinates.
//!
//! For tile `(z, tx, ty)` with extent `E`: `X = round(E * (mx * 2^z - tx))`,
//! likewise for y. Coordinates in the buffer margin may be negative or
//! exceed the extent.

/// Produces a fresh signed 32-bit coordinate buffer.
#[must_use]
pub fn transform_to_tile(xy: &[f64], z: u8, tx: u32, ty: u32, extent: u32) -> Vec<i32> {
	let zoom = f64::from(1u32 << z);
	let e = f64::from(extent);
	let tx = f64::from(tx);
	let ty = f64::from(ty);

	let mut out = Vec::with_capacity(xy.len());
	for pair in xy.chunks_exact(2) {
		out.push((e * (pair[0] * zoom - tx)).round() as i32);
		out.push((e * (pair[1] * zoom - ty)).round() as i32);
	}
	out
}
