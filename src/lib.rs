//! batchml - Memory-bounded batch classification pipeline
//!
//! This crate trains, evaluates, and runs a linear classifier over tabular
//! datasets streamed from delimited files, keeping memory bounded even when
//! the dataset does not fit in memory:
//! - Streaming dataset ingestion with a two-row metadata header
//! - Incremental (partial) training over fixed-size batches
//! - Batched prediction preserving per-row sample identity
//! - Repeated shuffled-split evaluation with deviation/score thresholds
//!   and a memory-budget guard
//! - Persisted-model lifecycle with defensive validation of imported
//!   serialized model data
//!
//! # Modules
//!
//! - [`dataset`] - Streaming reader and batch accumulation
//! - [`classifier`] - Classifier capability trait and the SGD implementation
//! - [`metrics`] - Classification report and score statistics
//! - [`store`] - Persisted-model save/load/export/import
//! - [`pipeline`] - Operation facade and result objects
//! - [`config`] - Pipeline configuration and the runtime readiness gate

pub mod error;

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod pipeline;
pub mod store;

pub use error::{BatchmlError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classifier::{Classifier, SgdClassifier, SgdConfig};
    pub use crate::config::{PipelineConfig, RuntimeVersion};
    pub use crate::dataset::{BatchAccumulator, DatasetMetadata, DatasetReader, ReaderConfig};
    pub use crate::error::{BatchmlError, Result};
    pub use crate::metrics::ClassificationReport;
    pub use crate::pipeline::{
        Pipeline, PipelineResult, Prediction, STATUS_LOW_SCORE, STATUS_NOT_ENOUGH_DATA,
        STATUS_NO_DATASET, STATUS_OK,
    };
    pub use crate::store::ModelStore;
}
