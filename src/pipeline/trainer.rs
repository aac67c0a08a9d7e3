//! Incremental training over a streamed dataset

use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use tracing::{debug, info};

use super::result::{PipelineResult, STATUS_NO_DATASET};
use crate::classifier::{Classifier, SgdClassifier, SgdConfig};
use crate::config::PipelineConfig;
use crate::dataset::{BatchAccumulator, DatasetReader, ReaderConfig};
use crate::error::{BatchmlError, Result};
use crate::store::ModelStore;

/// Parse one training row: `n_features` feature columns followed by the
/// integer target class
fn parse_row(row: Vec<String>, n_features: usize) -> Result<(Vec<f64>, i64)> {
    if row.len() < n_features + 1 {
        return Err(BatchmlError::Dataset(format!(
            "training row has {} fields, expected at least {}",
            row.len(),
            n_features + 1
        )));
    }

    let mut features = Vec::with_capacity(n_features);
    for value in &row[..n_features] {
        features.push(value.trim().parse::<f64>().map_err(|_| {
            BatchmlError::Dataset(format!("non-numeric feature value: {}", value))
        })?);
    }

    let target = row[n_features].trim().parse::<f64>().map_err(|_| {
        BatchmlError::Dataset(format!("non-numeric target value: {}", row[n_features]))
    })? as i64;

    Ok((features, target))
}

/// Drive partial training of `classifier` over every batch in the stream.
///
/// Returns the total number of samples seen. A batch of one row can only
/// be the first and only batch (a trailing partial batch always follows a
/// full one), so the degenerate single-sample dataset is detected before
/// any training happens and no partial fit runs for it.
pub(crate) fn train_stream<C, R>(
    classifier: &mut C,
    reader: &mut DatasetReader<R>,
    n_features: usize,
    classes: &[i64],
    batch_size: usize,
) -> Result<usize>
where
    C: Classifier,
    R: std::io::Read,
{
    let accumulator = BatchAccumulator::new(batch_size);
    let mut batches = 0usize;

    let total = accumulator.run(
        reader,
        |row| parse_row(row, n_features),
        |batch: Vec<(Vec<f64>, i64)>| {
            if batches == 0 && batch.len() < 2 {
                // Degenerate dataset; leave the classifier untouched
                return Ok(());
            }

            let n = batch.len();
            let mut values = Vec::with_capacity(n * n_features);
            let mut targets = Vec::with_capacity(n);
            for (features, target) in batch {
                values.extend(features);
                targets.push(target);
            }

            let x = Array2::from_shape_vec((n, n_features), values)
                .map_err(|e| BatchmlError::Training(e.to_string()))?;
            let y = Array1::from_vec(targets);

            classifier.partial_fit(&x, &y, classes)?;
            batches += 1;
            debug!(batch = batches, rows = n, "Trained batch");
            Ok(())
        },
    )?;

    Ok(total)
}

/// Train (or continue training) the model identified by `model_id` on the
/// dataset at `dataset_path`, persisting it under `out_dir` on success
pub(crate) fn run(
    config: &PipelineConfig,
    model_id: &str,
    dataset_path: &Path,
    out_dir: &Path,
) -> Result<PipelineResult> {
    let file = File::open(dataset_path)?;
    let mut reader = DatasetReader::new(file, ReaderConfig::default());

    let metadata = reader.extract_metadata()?;
    let n_features = metadata.n_features()?;
    let classes = metadata.target_classes()?;
    reader.skip_header()?;

    let mut classifier = if ModelStore::exists(out_dir) {
        ModelStore::load(out_dir)?
    } else {
        SgdClassifier::new(SgdConfig::default())
    };

    // A full batch must hold at least 2 rows so a 1-row batch is always
    // the first and only one
    let total = train_stream(
        &mut classifier,
        &mut reader,
        n_features,
        &classes,
        config.batch_size.max(2),
    )?;

    if total <= 1 {
        info!(model_id = %model_id, samples = total, "Too few samples to train");
        let mut result = PipelineResult::ok();
        result.add_status(STATUS_NO_DATASET);
        result.add_info(format!(
            "dataset has {} usable sample(s); at least 2 are required",
            total
        ));
        return Ok(result);
    }

    // Persistence is the final step only, after every batch trained
    ModelStore::save(&classifier, out_dir)?;
    info!(model_id = %model_id, samples = total, "Training complete");

    Ok(PipelineResult::ok())
}
