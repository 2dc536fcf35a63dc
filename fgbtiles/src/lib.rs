//! On-demand Mapbox Vector Tiles from cloud-optimized FlatGeobuf datasets.
//!
//! One request, given tile coordinates `(z, x, y)` and one or more
//! FlatGeobuf sources, returns an MVT protobuf payload encoding the
//! features intersecting the tile — without any pre-tiled intermediate
//! storage. Per source the orchestrator issues at most three header reads
//! (none on cache hit) plus the merged feature range reads, then runs the
//! CPU pipeline: decode, project, clip, simplify, transform, wind, encode.
//!
//! ```rust,no_run
//! use fgbtiles::{Tiler, TileSource};
//! use fgbtiles_core::io::DataReaderFile;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let reader = DataReaderFile::open(Path::new("/data/cities.fgb"))?;
//! let mut tiler = Tiler::new();
//! tiler.add_reader(reader, vec![TileSource::new("cities")]);
//! let tile = tiler.get_tile(5, 17, 10).await?;
//! # Ok(()) }
//! ```

mod caches;
mod options;
mod source;
mod tile;
mod tiler;

pub use caches::{HeaderCache, HeaderEntry, TileBoundsCache};
pub use options::{TileOptions, TileOptionsOverride};
pub use source::{TileSource, process_source};
pub use tile::{SourceGroup, process_tile};
pub use tiler::Tiler;
