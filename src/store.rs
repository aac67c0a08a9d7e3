//! Persisted-model storage
//!
//! One classifier per model directory, serialized to a single fixed-name
//! JSON file. Imported model data is untrusted: it passes a strict
//! character allow-list and a type-restricted deserialization before it
//! can reach the destination directory, and a successful import is
//! re-saved through the normal path rather than byte-copied.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::SgdClassifier;
use crate::error::{BatchmlError, Result};

/// Fixed name of the serialized model inside a model directory
pub const MODEL_FILENAME: &str = "model.json";

/// Envelope format revision accepted by `load`/`import`
const MODEL_FORMAT_VERSION: u32 = 1;

/// The only algorithm this store will materialize
const ALGORITHM: &str = "sgd-ovr-logistic";

/// Characters plausible in the serialized-model grammar. Anything else
/// is stripped from imported bytes before parsing; an embedded payload
/// loses the characters it needs and fails the restricted parse.
fn allowed_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'{' | b'}'
                | b'['
                | b']'
                | b'%'
                | b'.'
                | b';'
                | b','
                | b':'
                | b'"'
                | b'-'
                | b'_'
                | b'+'
                | b'\\'
                | 0
        )
}

/// On-disk model envelope; the restricted import parse only ever
/// constructs this type
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelEnvelope {
    format: u32,
    algorithm: String,
    classifier: SgdClassifier,
}

impl ModelEnvelope {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.format != MODEL_FORMAT_VERSION {
            return Err(format!("unsupported model format revision {}", self.format));
        }
        if self.algorithm != ALGORITHM {
            return Err(format!("unexpected algorithm '{}'", self.algorithm));
        }
        if !self.classifier.is_fitted() {
            return Err("serialized classifier is incomplete".to_string());
        }
        Ok(())
    }
}

/// Storage operations over model directories
pub struct ModelStore;

impl ModelStore {
    fn model_file(dir: &Path) -> PathBuf {
        dir.join(MODEL_FILENAME)
    }

    /// True when `dir` holds a persisted model
    pub fn exists(dir: &Path) -> bool {
        Self::model_file(dir).is_file()
    }

    /// Serialize `classifier` to the fixed-name file under `dir`,
    /// creating the directory if needed
    pub fn save(classifier: &SgdClassifier, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let envelope = ModelEnvelope {
            format: MODEL_FORMAT_VERSION,
            algorithm: ALGORITHM.to_string(),
            classifier: classifier.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(Self::model_file(dir), json)?;
        Ok(())
    }

    /// Deserialize the classifier persisted under `dir`
    pub fn load(dir: &Path) -> Result<SgdClassifier> {
        let path = Self::model_file(dir);
        if !path.is_file() {
            return Err(BatchmlError::ModelNotFound(dir.display().to_string()));
        }

        let json = fs::read_to_string(&path)?;
        let envelope: ModelEnvelope = serde_json::from_str(&json)?;
        envelope
            .validate()
            .map_err(BatchmlError::Serialization)?;
        Ok(envelope.classifier)
    }

    /// Return `dir` as the exportable unit; the caller archives it
    pub fn export(model_id: &str, dir: &Path) -> Result<PathBuf> {
        if !Self::exists(dir) {
            return Err(BatchmlError::ModelNotFound(dir.display().to_string()));
        }
        info!(model_id = %model_id, dir = %dir.display(), "Exporting model directory");
        Ok(dir.to_path_buf())
    }

    /// Import a model file from `import_dir` into `dir`.
    ///
    /// Returns `Ok(false)` and leaves `dir` untouched when the imported
    /// bytes fail the allow-list/restricted-deserialization gate.
    pub fn import(model_id: &str, dir: &Path, import_dir: &Path) -> Result<bool> {
        let source = Self::model_file(import_dir);
        if !source.is_file() {
            warn!(model_id = %model_id, "Import directory has no model file");
            return Ok(false);
        }

        let raw = fs::read(&source)?;
        let filtered: String = raw
            .iter()
            .copied()
            .filter(|&b| allowed_byte(b))
            .map(char::from)
            .collect();

        let envelope: ModelEnvelope = match serde_json::from_str(&filtered) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(model_id = %model_id, error = %e, "Rejected imported model data");
                return Ok(false);
            }
        };
        if let Err(reason) = envelope.validate() {
            warn!(model_id = %model_id, reason = %reason, "Rejected imported model");
            return Ok(false);
        }

        // Full load+resave through the normal path, never a byte copy
        Self::save(&envelope.classifier, dir)?;
        info!(model_id = %model_id, dir = %dir.display(), "Imported model");
        Ok(true)
    }

    /// Remove the persisted model file for `model_id`, if any
    pub fn clear_model(model_id: &str, dir: &Path) -> Result<()> {
        let path = Self::model_file(dir);
        if path.is_file() {
            fs::remove_file(&path)?;
            info!(model_id = %model_id, "Cleared persisted model");
        }
        Ok(())
    }

    /// Recursively remove a model output directory, if present
    pub fn delete_output_dir(dir: &Path) -> Result<()> {
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
