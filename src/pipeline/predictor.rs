//! Batched prediction preserving sample identity

use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use tracing::info;

use super::result::{PipelineResult, Prediction};
use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::dataset::{BatchAccumulator, DatasetReader, ReaderConfig};
use crate::error::{BatchmlError, Result};
use crate::store::ModelStore;

/// Parse one prediction row: an opaque sample id followed by
/// `n_features` feature columns
fn parse_row(row: Vec<String>, n_features: usize) -> Result<(String, Vec<f64>)> {
    if row.len() < n_features + 1 {
        return Err(BatchmlError::Dataset(format!(
            "prediction row has {} fields, expected at least {}",
            row.len(),
            n_features + 1
        )));
    }

    let mut row = row.into_iter();
    let sample_id = match row.next() {
        Some(id) => id,
        None => return Err(BatchmlError::Dataset("empty prediction row".to_string())),
    };

    let mut features = Vec::with_capacity(n_features);
    for value in row.take(n_features) {
        features.push(value.trim().parse::<f64>().map_err(|_| {
            BatchmlError::Dataset(format!("non-numeric feature value: {}", value))
        })?);
    }

    Ok((sample_id, features))
}

/// Predict every batch in the stream, appending labels in input order
pub(crate) fn predict_stream<C, R>(
    classifier: &C,
    reader: &mut DatasetReader<R>,
    n_features: usize,
    batch_size: usize,
) -> Result<Vec<Prediction>>
where
    C: Classifier,
    R: std::io::Read,
{
    let accumulator = BatchAccumulator::new(batch_size);
    let mut predictions: Vec<Prediction> = Vec::new();

    accumulator.run(
        reader,
        |row| parse_row(row, n_features),
        |batch: Vec<(String, Vec<f64>)>| {
            let n = batch.len();
            let mut ids = Vec::with_capacity(n);
            let mut values = Vec::with_capacity(n * n_features);
            for (sample_id, features) in batch {
                ids.push(sample_id);
                values.extend(features);
            }

            let x = Array2::from_shape_vec((n, n_features), values)
                .map_err(|e| BatchmlError::Dataset(e.to_string()))?;
            let labels = classifier.predict(&x)?;

            predictions.extend(
                ids.into_iter()
                    .zip(labels)
                    .map(|(sample_id, label)| Prediction { sample_id, label }),
            );
            Ok(())
        },
    )?;

    Ok(predictions)
}

/// Predict labels for the dataset at `dataset_path` using the model
/// persisted under `out_dir`
pub(crate) fn run(
    config: &PipelineConfig,
    model_id: &str,
    dataset_path: &Path,
    out_dir: &Path,
) -> Result<PipelineResult> {
    // Load precondition first; an absent model fails the whole operation
    let classifier = ModelStore::load(out_dir)?;

    let file = File::open(dataset_path)?;
    let mut reader = DatasetReader::new(file, ReaderConfig::default());

    let metadata = reader.extract_metadata()?;
    let n_features = metadata.n_features()?;
    reader.skip_header()?;

    let predictions = predict_stream(&classifier, &mut reader, n_features, config.batch_size)?;
    info!(model_id = %model_id, samples = predictions.len(), "Prediction complete");

    let mut result = PipelineResult::ok();
    result.predictions = predictions;
    Ok(result)
}
