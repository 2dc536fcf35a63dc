//! Binary I/O: asynchronous byte-range readers and endian-parameterized
//! value readers/writers.
//!
//! The [`DataReaderTrait`] is the only suspension point in the tiling
//! pipeline; everything else in the workspace is synchronous CPU work over
//! buffers obtained through it.

mod data_reader;
mod data_reader_blob;
mod data_reader_file;
mod data_reader_http;
mod value_reader;
mod value_reader_slice;
mod value_writer;
mod value_writer_blob;

pub use data_reader::{DataReader, DataReaderTrait};
pub use data_reader_blob::DataReaderBlob;
pub use data_reader_file::DataReaderFile;
pub use data_reader_http::DataReaderHttp;
pub use value_reader::{SeekRead, ValueReader};
pub use value_reader_slice::ValueReaderSlice;
pub use value_writer::ValueWriter;
pub use value_writer_blob::ValueWriterBlob;
