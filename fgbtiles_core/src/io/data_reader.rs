//! This module defines the `DataReaderTrait`, the asynchronous byte-range
//! reader abstraction backing every FlatGeobuf source.
//!
//! # Contract
//!
//! - `read_range` may return fewer bytes than requested only when the
//!   resource ends before `offset + length`. The spatial index deliberately
//!   over-fetches the final feature span, so a short tail read is a normal
//!   condition, not an error.
//! - `read_ranges` resolves many ranges and returns the results in input
//!   order; the default implementation overlaps the reads with a bounded
//!   concurrency.
//! - Any other failure is surfaced as an error and is fatal for the current
//!   tile request; partial success across ranges is not a defined mode.

use crate::{Blob, ByteRange};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::fmt::Debug;

/// How many range reads the default `read_ranges` keeps in flight.
const CONCURRENT_RANGE_READS: usize = 8;

/// Type alias for a boxed dynamic implementation of the `DataReaderTrait`.
pub type DataReader = Box<dyn DataReaderTrait>;

/// A trait for reading byte ranges from a data source.
#[async_trait]
pub trait DataReaderTrait: Debug + Send + Sync {
	/// Reads one byte range, clamped at the end of the resource.
	async fn read_range(&self, range: &ByteRange) -> Result<Blob>;

	/// Reads several byte ranges; results match the input order.
	///
	/// The default implementation runs the single-range reads concurrently,
	/// capped at an implementation-chosen limit.
	async fn read_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Blob>> {
		let mut blobs = Vec::with_capacity(ranges.len());
		for chunk in ranges.chunks(CONCURRENT_RANGE_READS) {
			let mut chunk_blobs = try_join_all(chunk.iter().map(|range| self.read_range(range))).await?;
			blobs.append(&mut chunk_blobs);
		}
		Ok(blobs)
	}

	/// Reads the entire resource.
	async fn read_all(&self) -> Result<Blob>;

	/// A stable name identifying the data source (path or URL).
	fn get_name(&self) -> &str;
}
