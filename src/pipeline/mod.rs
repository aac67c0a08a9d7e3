//! Pipeline operations
//!
//! The [`Pipeline`] facade exposes the full operation contract: training,
//! prediction, evaluation, the persisted-model lifecycle, and the
//! permanently unsupported regression surface. Every operation runs to
//! completion on the calling thread and owns its dataset handle and
//! classifier exclusively for the duration of the call.

mod evaluator;
mod predictor;
mod result;
mod trainer;

pub use result::{
    PipelineResult, Prediction, STATUS_LOW_SCORE, STATUS_NOT_ENOUGH_DATA, STATUS_NO_DATASET,
    STATUS_OK,
};

use std::path::{Path, PathBuf};

use crate::config::{PipelineConfig, MIN_RUNTIME_VERSION};
use crate::error::{BatchmlError, Result};
use crate::store::ModelStore;

/// Facade over the training/prediction/evaluation operations
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Readiness gate: the whole capability set requires a minimum host
    /// runtime version
    pub fn is_ready(&self) -> Result<()> {
        let version = self.config.effective_runtime_version()?;
        if version < MIN_RUNTIME_VERSION {
            return Err(BatchmlError::Unsupported(
                "host runtime version is below the minimum this pipeline supports",
            ));
        }
        Ok(())
    }

    /// Incrementally train (or continue training) a classification model
    /// on a streamed dataset, persisting it under `out_dir`
    pub fn train_classification(
        &self,
        model_id: &str,
        dataset_path: &Path,
        out_dir: &Path,
    ) -> Result<PipelineResult> {
        self.is_ready()?;
        trainer::run(&self.config, model_id, dataset_path, out_dir)
    }

    /// Predict labels for a streamed dataset using the model persisted
    /// under `out_dir`, preserving per-row sample identity
    pub fn classify(
        &self,
        model_id: &str,
        dataset_path: &Path,
        out_dir: &Path,
    ) -> Result<PipelineResult> {
        self.is_ready()?;
        predictor::run(&self.config, model_id, dataset_path, out_dir)
    }

    /// Evaluate classification quality over `n_iterations` shuffled
    /// train/test splits, or re-test the fixed model in
    /// `trained_model_dir` once
    pub fn evaluate_classification(
        &self,
        model_id: &str,
        max_deviation: f64,
        n_iterations: usize,
        dataset_path: &Path,
        out_dir: &Path,
        trained_model_dir: Option<&Path>,
    ) -> Result<PipelineResult> {
        self.is_ready()?;
        evaluator::run(
            &self.config,
            model_id,
            max_deviation,
            n_iterations,
            dataset_path,
            out_dir,
            trained_model_dir,
        )
    }

    /// Return the model directory as the exportable unit
    pub fn export_model(&self, model_id: &str, model_dir: &Path) -> Result<PathBuf> {
        self.is_ready()?;
        ModelStore::export(model_id, model_dir)
    }

    /// Import untrusted serialized model data from `import_dir` into
    /// `model_dir`; `Ok(false)` means the data was rejected
    pub fn import_model(&self, model_id: &str, model_dir: &Path, import_dir: &Path) -> Result<bool> {
        self.is_ready()?;
        ModelStore::import(model_id, model_dir, import_dir)
    }

    /// Remove the persisted model file, if any
    pub fn clear_model(&self, model_id: &str, model_dir: &Path) -> Result<()> {
        self.is_ready()?;
        ModelStore::clear_model(model_id, model_dir)
    }

    /// Recursively remove a model output directory
    pub fn delete_output_dir(&self, dir: &Path) -> Result<()> {
        self.is_ready()?;
        ModelStore::delete_output_dir(dir)
    }

    /// Regression training was never implemented; calling this is a
    /// programming error, not a transient failure
    pub fn train_regression(
        &self,
        _model_id: &str,
        _dataset_path: &Path,
        _out_dir: &Path,
    ) -> Result<PipelineResult> {
        Err(BatchmlError::Unsupported("regression training"))
    }

    /// Regression estimation was never implemented
    pub fn estimate(
        &self,
        _model_id: &str,
        _dataset_path: &Path,
        _out_dir: &Path,
    ) -> Result<PipelineResult> {
        Err(BatchmlError::Unsupported("regression estimation"))
    }

    /// Regression evaluation was never implemented
    pub fn evaluate_regression(
        &self,
        _model_id: &str,
        _max_deviation: f64,
        _n_iterations: usize,
        _dataset_path: &Path,
        _out_dir: &Path,
    ) -> Result<PipelineResult> {
        Err(BatchmlError::Unsupported("regression evaluation"))
    }
}
