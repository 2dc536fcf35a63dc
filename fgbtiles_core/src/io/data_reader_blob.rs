//! This module provides an in-memory byte-range reader.
//!
//! `DataReaderBlob` serves callers that already hold a complete FlatGeobuf
//! in memory and is the workhorse of the test suite: every end-to-end
//! scenario runs against it without touching the filesystem or network.

use super::DataReaderTrait;
use crate::{Blob, ByteRange};
use anyhow::{Result, ensure};
use async_trait::async_trait;

/// A byte-range reader over an owned in-memory buffer.
#[derive(Debug)]
pub struct DataReaderBlob {
	name: String,
	blob: Blob,
}

impl DataReaderBlob {
	pub fn new(name: &str, blob: Blob) -> DataReaderBlob {
		DataReaderBlob {
			name: name.to_string(),
			blob,
		}
	}

	pub fn len(&self) -> u64 {
		self.blob.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blob.is_empty()
	}
}

#[async_trait]
impl DataReaderTrait for DataReaderBlob {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(
			range.offset <= self.blob.len(),
			"range {range} starts past the end of '{}' ({} bytes)",
			self.name,
			self.blob.len()
		);
		let end = range.end().min(self.blob.len()) as usize;
		Ok(Blob::from(&self.blob.as_slice()[range.offset as usize..end]))
	}

	async fn read_all(&self) -> Result<Blob> {
		Ok(self.blob.clone())
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}
