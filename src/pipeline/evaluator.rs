//! Repeated shuffled-split evaluation with a memory-budget guard

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::result::{PipelineResult, STATUS_LOW_SCORE, STATUS_NOT_ENOUGH_DATA};
use crate::classifier::{Classifier, SgdClassifier, SgdConfig};
use crate::config::{PipelineConfig, MEMORY_COST_PER_VALUE, MIN_ACCEPTED_SCORE, TEST_FRACTION};
use crate::dataset::{DatasetReader, ReaderConfig};
use crate::error::{BatchmlError, Result};
use crate::metrics::{mean, population_std_dev, ClassificationReport};
use crate::store::ModelStore;

/// The evaluation dataset buffered in memory, possibly cut short by the
/// byte budget
struct BufferedDataset {
    samples: Vec<Vec<f64>>,
    targets: Vec<i64>,
    /// True when the memory guard stopped buffering before stream end
    size_limited: bool,
}

/// Buffer the full dataset, tracking an estimated in-memory cost per
/// scalar and stopping at the budget unless the guard is disabled
fn buffer_dataset<R: std::io::Read>(
    reader: &mut DatasetReader<R>,
    n_features: usize,
    config: &PipelineConfig,
) -> Result<BufferedDataset> {
    let mut samples = Vec::new();
    let mut targets = Vec::new();
    let mut estimated_bytes = 0u64;
    let mut size_limited = false;

    for row in reader.by_ref() {
        let row = row?;
        if row.len() < n_features + 1 {
            return Err(BatchmlError::Dataset(format!(
                "evaluation row has {} fields, expected at least {}",
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

        samples.push(features);
        targets.push(target);

        estimated_bytes += (n_features as u64 + 1) * MEMORY_COST_PER_VALUE;
        if !config.skip_memory_guard && estimated_bytes > config.memory_budget_bytes {
            warn!(
                buffered = samples.len(),
                "Memory budget reached, evaluating on a truncated sample"
            );
            size_limited = true;
            break;
        }
    }

    Ok(BufferedDataset {
        samples,
        targets,
        size_limited,
    })
}

/// Every observed class needs at least two samples and every declared
/// class must be observed
fn has_sufficient_data(targets: &[i64], n_declared_classes: usize) -> bool {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &t in targets {
        *counts.entry(t).or_insert(0) += 1;
    }
    counts.len() == n_declared_classes && counts.values().all(|&c| c >= 2)
}

fn to_matrix(samples: &[Vec<f64>], indices: &[usize], n_features: usize) -> Result<Array2<f64>> {
    let mut values = Vec::with_capacity(indices.len() * n_features);
    for &i in indices {
        values.extend_from_slice(&samples[i]);
    }
    Array2::from_shape_vec((indices.len(), n_features), values)
        .map_err(|e| BatchmlError::Dataset(e.to_string()))
}

/// One train/test iteration on a fresh shuffled 80/20 split
fn score_split(
    data: &BufferedDataset,
    n_features: usize,
    rng: &mut ChaCha8Rng,
) -> Result<f64> {
    let n = data.samples.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let n_test = ((n as f64 * TEST_FRACTION).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let x_train = to_matrix(&data.samples, train_idx, n_features)?;
    let y_train = Array1::from_vec(train_idx.iter().map(|&i| data.targets[i]).collect());

    let mut classifier = SgdClassifier::new(SgdConfig::default());
    classifier.fit(&x_train, &y_train)?;

    let x_test = to_matrix(&data.samples, test_idx, n_features)?;
    let y_test: Vec<i64> = test_idx.iter().map(|&i| data.targets[i]).collect();
    let predicted = classifier.predict(&x_test)?;

    Ok(ClassificationReport::compute(&y_test, &predicted).weighted_f1())
}

/// Score a fixed pre-trained model against the full buffered set
fn score_pretrained(
    classifier: &SgdClassifier,
    data: &BufferedDataset,
    n_features: usize,
) -> Result<f64> {
    let indices: Vec<usize> = (0..data.samples.len()).collect();
    let x = to_matrix(&data.samples, &indices, n_features)?;
    let predicted = classifier.predict(&x)?;
    Ok(ClassificationReport::compute(&data.targets, &predicted).weighted_f1())
}

/// Evaluate classification quality over repeated shuffled splits, or
/// re-test a fixed pre-trained model once
#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    config: &PipelineConfig,
    model_id: &str,
    max_deviation: f64,
    n_iterations: usize,
    dataset_path: &Path,
    _out_dir: &Path,
    trained_model_dir: Option<&Path>,
) -> Result<PipelineResult> {
    let file = File::open(dataset_path)?;
    let mut reader = DatasetReader::new(file, ReaderConfig::default());

    let metadata = reader.extract_metadata()?;
    let n_features = metadata.n_features()?;
    let n_declared_classes = metadata.n_target_classes()?;
    reader.skip_header()?;

    let data = buffer_dataset(&mut reader, n_features, config)?;
    drop(reader);

    let mut result = PipelineResult::ok();

    if !has_sufficient_data(&data.targets, n_declared_classes) {
        info!(model_id = %model_id, "Evaluation aborted, insufficient samples per class");
        result.add_status(STATUS_NOT_ENOUGH_DATA);
        result.add_info(
            "evaluation requires every target class to appear at least twice in the dataset"
                .to_string(),
        );
        result.score = Some(0.0);
        return Ok(result);
    }

    // Re-testing a fixed model is deterministic, one iteration is enough
    let (scores, n_iterations) = match trained_model_dir {
        Some(model_dir) => {
            let classifier = ModelStore::load(model_dir)?;
            (vec![score_pretrained(&classifier, &data, n_features)?], 1)
        }
        None => {
            let mut rng = match config.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            let n_iterations = n_iterations.max(1);
            let mut scores = Vec::with_capacity(n_iterations);
            for _ in 0..n_iterations {
                scores.push(score_split(&data, n_features, &mut rng)?);
            }
            (scores, n_iterations)
        }
    };

    let avg = mean(&scores);
    let deviation = population_std_dev(&scores);
    result.score = Some(avg);

    if deviation > max_deviation {
        result.add_status(STATUS_NOT_ENOUGH_DATA);
        result.add_info(format!(
            "scores deviation {:.4} exceeds the accepted deviation {:.4}; results vary too much across resamples",
            deviation, max_deviation
        ));
    }

    if avg < MIN_ACCEPTED_SCORE {
        result.add_status(STATUS_LOW_SCORE);
        result.add_info(format!(
            "mean score {:.4} is below the minimum accepted score {:.4}",
            avg, MIN_ACCEPTED_SCORE
        ));
    }

    if data.size_limited {
        let on_disk = std::fs::metadata(dataset_path).map(|m| m.len()).unwrap_or(0);
        result.add_info(format!(
            "dataset of {} bytes on disk exceeded the evaluation memory budget; only {} buffered samples were evaluated",
            on_disk,
            data.samples.len()
        ));
    }

    info!(
        model_id = %model_id,
        iterations = n_iterations,
        score = avg,
        deviation,
        "Evaluation complete"
    );

    Ok(result)
}
