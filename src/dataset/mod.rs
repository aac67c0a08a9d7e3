//! Dataset ingestion
//!
//! Streaming delimited-file reading with a two-row metadata header, and
//! fixed-size batch accumulation over the resulting row stream.

mod batcher;
mod reader;

pub use batcher::BatchAccumulator;
pub use reader::{DatasetMetadata, DatasetReader, ReaderConfig};
