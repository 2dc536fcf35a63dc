//! This module provides a byte-range reader over a local file.
//!
//! Reads past the end of the file are clamped rather than rejected: the
//! spatial index caps the final feature span with a fixed upper bound that
//! routinely extends beyond the dataset.

use super::DataReaderTrait;
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use std::{
	fs::File,
	io::{Read, Seek, SeekFrom},
	path::Path,
};

/// A byte-range reader over a local file.
#[derive(Debug)]
pub struct DataReaderFile {
	name: String,
	file: File,
	size: u64,
}

impl DataReaderFile {
	/// Opens `path` for range reading.
	pub fn open(path: &Path) -> Result<Box<DataReaderFile>> {
		ensure!(path.exists(), "file {path:?} does not exist");
		ensure!(path.is_file(), "path {path:?} must be a file");

		let path = path.canonicalize()?;
		let file = File::open(&path)?;
		let size = file.metadata()?.len();

		Ok(Box::new(DataReaderFile {
			name: path.to_string_lossy().to_string(),
			file,
			size,
		}))
	}
}

#[async_trait]
impl DataReaderTrait for DataReaderFile {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(
			range.offset <= self.size,
			"range {range} starts past the end of '{}' ({} bytes)",
			self.name,
			self.size
		);
		let length = range.length.min(self.size - range.offset);

		let mut buffer = vec![0; length as usize];
		let mut file = self
			.file
			.try_clone()
			.with_context(|| format!("failed to clone file handle for '{}'", self.name))?;
		file
			.seek(SeekFrom::Start(range.offset))
			.with_context(|| format!("failed to seek to offset {} in '{}'", range.offset, self.name))?;
		file
			.read_exact(&mut buffer)
			.with_context(|| format!("failed to read {length} bytes at offset {} in '{}'", range.offset, self.name))?;
		Ok(Blob::from(buffer))
	}

	async fn read_all(&self) -> Result<Blob> {
		self.read_range(&ByteRange::new(0, self.size)).await
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::NamedTempFile;
	use std::io::Write;

	fn temp_file(content: &[u8]) -> Result<NamedTempFile> {
		let temp = NamedTempFile::new("data.fgb")?;
		File::create(temp.path())?.write_all(content)?;
		Ok(temp)
	}

	#[tokio::test]
	async fn open_checks_path() -> Result<()> {
		let temp = temp_file(b"Hello, world!")?;
		assert!(DataReaderFile::open(temp.path()).is_ok());

		let missing = NamedTempFile::new("missing.fgb")?;
		assert!(DataReaderFile::open(missing.path()).is_err());
		Ok(())
	}

	#[tokio::test]
	async fn read_range() -> Result<()> {
		let temp = temp_file(b"Hello, world!")?;
		let reader = DataReaderFile::open(temp.path())?;
		let blob = reader.read_range(&ByteRange::new(4, 6)).await?;
		assert_eq!(blob.as_str(), "o, wor");
		Ok(())
	}

	#[tokio::test]
	async fn read_range_clamps_short_tail() -> Result<()> {
		let temp = temp_file(b"Hello")?;
		let reader = DataReaderFile::open(temp.path())?;
		let blob = reader.read_range(&ByteRange::new(3, 100)).await?;
		assert_eq!(blob.as_str(), "lo");
		assert!(reader.read_range(&ByteRange::new(6, 1)).await.is_err());
		Ok(())
	}

	#[tokio::test]
	async fn read_all() -> Result<()> {
		let temp = temp_file(b"complete content")?;
		let reader = DataReaderFile::open(temp.path())?;
		assert_eq!(reader.read_all().await?.as_str(), "complete content");
		Ok(())
	}
}
