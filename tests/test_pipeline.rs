//! Integration tests: full pipeline over on-disk datasets and model dirs

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use batchml::config::{PipelineConfig, MEMORY_COST_PER_VALUE};
use batchml::pipeline::{Pipeline, STATUS_NOT_ENOUGH_DATA, STATUS_NO_DATASET, STATUS_OK};
use batchml::store::{ModelStore, MODEL_FILENAME};
use batchml::BatchmlError;

/// Two separable clusters, classes interleaved so any prefix of the file
/// keeps both classes represented
fn write_training_dataset(path: &Path, rows_per_class: usize) {
    let mut data = String::from("nfeatures,targetclasses\n2,\"[0,1]\"\nf1,f2,target\n");
    for i in 0..rows_per_class {
        let jitter = (i % 10) as f64 / 20.0;
        data.push_str(&format!("{},{},0\n", jitter, 0.5 - jitter));
        data.push_str(&format!("{},{},1\n", 5.0 + jitter, 5.5 - jitter));
    }
    fs::write(path, data).unwrap();
}

fn write_prediction_dataset(path: &Path, n_rows: usize) {
    let mut data = String::from("nfeatures,targetclasses\n2,\"[0,1]\"\nid,f1,f2\n");
    for i in 0..n_rows {
        let jitter = (i % 10) as f64 / 20.0;
        if i % 2 == 0 {
            data.push_str(&format!("row-{},{},{}\n", i, jitter, 0.5 - jitter));
        } else {
            data.push_str(&format!("row-{},{},{}\n", i, 5.0 + jitter, 5.5 - jitter));
        }
    }
    fs::write(path, data).unwrap();
}

fn pipeline(batch_size: usize) -> Pipeline {
    Pipeline::new(
        PipelineConfig::new()
            .with_batch_size(batch_size)
            .with_random_state(42),
    )
}

#[test]
fn test_train_then_classify_preserves_row_identity() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let predict_path = dir.path().join("predict.csv");
    let model_dir = dir.path().join("model");

    write_training_dataset(&train_path, 60);
    write_prediction_dataset(&predict_path, 23);

    // Batch size far below the row count so both loops span batches
    let p = pipeline(8);
    let trained = p.train_classification("m1", &train_path, &model_dir).unwrap();
    assert_eq!(trained.status, STATUS_OK);
    assert!(ModelStore::exists(&model_dir));

    let result = p.classify("m1", &predict_path, &model_dir).unwrap();
    assert_eq!(result.status, STATUS_OK);
    assert_eq!(result.predictions.len(), 23);

    for (i, prediction) in result.predictions.iter().enumerate() {
        assert_eq!(prediction.sample_id, format!("row-{}", i));
        let expected = (i % 2) as i64;
        assert_eq!(prediction.label, expected, "row {} misclassified", i);
    }
}

#[test]
fn test_predictions_stable_across_batch_sizes() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let predict_path = dir.path().join("predict.csv");
    write_training_dataset(&train_path, 50);
    write_prediction_dataset(&predict_path, 40);

    let mut all_labels = Vec::new();
    for (i, batch_size) in [5usize, 64, 5000].into_iter().enumerate() {
        let model_dir = dir.path().join(format!("model-{}", i));
        let p = pipeline(batch_size);
        p.train_classification("m1", &train_path, &model_dir).unwrap();
        let result = p.classify("m1", &predict_path, &model_dir).unwrap();
        all_labels.push(
            result
                .predictions
                .iter()
                .map(|pr| pr.label)
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(all_labels[0], all_labels[1]);
    assert_eq!(all_labels[1], all_labels[2]);
}

#[test]
fn test_single_sample_dataset_reports_no_dataset() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let model_dir = dir.path().join("model");

    fs::write(
        &train_path,
        "nfeatures,targetclasses\n2,\"[0,1]\"\nf1,f2,target\n1.0,2.0,0\n",
    )
    .unwrap();

    let result = pipeline(5000)
        .train_classification("m1", &train_path, &model_dir)
        .unwrap();

    assert_eq!(result.status, STATUS_NO_DATASET);
    assert!(!result.info.is_empty());
    assert!(!model_dir.join(MODEL_FILENAME).exists());
}

#[test]
fn test_empty_dataset_reports_no_dataset() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let model_dir = dir.path().join("model");

    fs::write(
        &train_path,
        "nfeatures,targetclasses\n2,\"[0,1]\"\nf1,f2,target\n",
    )
    .unwrap();

    let result = pipeline(5000)
        .train_classification("m1", &train_path, &model_dir)
        .unwrap();

    assert_eq!(result.status, STATUS_NO_DATASET);
    assert!(!model_dir.exists());
}

#[test]
fn test_classify_without_model_fails() {
    let dir = tempdir().unwrap();
    let predict_path = dir.path().join("predict.csv");
    write_prediction_dataset(&predict_path, 4);

    let err = pipeline(5000)
        .classify("m1", &predict_path, &dir.path().join("missing"))
        .unwrap_err();
    assert!(matches!(err, BatchmlError::ModelNotFound(_)));
}

#[test]
fn test_incremental_training_continues_from_persisted_model() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let model_dir = dir.path().join("model");
    write_training_dataset(&train_path, 30);

    let p = pipeline(16);
    assert_eq!(
        p.train_classification("m1", &train_path, &model_dir).unwrap().status,
        STATUS_OK
    );
    // Second run loads the persisted model and keeps training
    assert_eq!(
        p.train_classification("m1", &train_path, &model_dir).unwrap().status,
        STATUS_OK
    );

    let predict_path = dir.path().join("predict.csv");
    write_prediction_dataset(&predict_path, 10);
    let result = p.classify("m1", &predict_path, &model_dir).unwrap();
    for (i, prediction) in result.predictions.iter().enumerate() {
        assert_eq!(prediction.label, (i % 2) as i64);
    }
}

#[test]
fn test_evaluation_on_separable_data_passes() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    write_training_dataset(&data_path, 60);

    let result = pipeline(5000)
        .evaluate_classification("m1", 0.3, 3, &data_path, dir.path(), None)
        .unwrap();

    assert_eq!(result.status, STATUS_OK, "diagnostics: {:?}", result.info);
    assert!(result.score.unwrap() >= 0.9);
}

#[test]
fn test_evaluation_flags_single_sample_class() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");

    let mut data = String::from("nfeatures,targetclasses\n2,\"[0,1]\"\nf1,f2,target\n");
    for i in 0..20 {
        data.push_str(&format!("{}.0,0.5,0\n", i));
    }
    data.push_str("5.0,5.5,1\n");
    fs::write(&data_path, data).unwrap();

    for n_iterations in [1, 10] {
        let result = pipeline(5000)
            .evaluate_classification("m1", 0.3, n_iterations, &data_path, dir.path(), None)
            .unwrap();
        assert_eq!(result.status, STATUS_NOT_ENOUGH_DATA);
        assert_eq!(result.score, Some(0.0));
    }
}

#[test]
fn test_evaluation_flags_missing_declared_class() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");

    // Three classes declared, only two present
    let mut data = String::from("nfeatures,targetclasses\n2,\"[0,1,2]\"\nf1,f2,target\n");
    for i in 0..10 {
        data.push_str(&format!("{}.0,0.5,{}\n", i, i % 2));
    }
    fs::write(&data_path, data).unwrap();

    let result = pipeline(5000)
        .evaluate_classification("m1", 0.3, 2, &data_path, dir.path(), None)
        .unwrap();
    assert_eq!(result.status, STATUS_NOT_ENOUGH_DATA);
    assert_eq!(result.score, Some(0.0));
}

#[test]
fn test_evaluation_with_pretrained_model_is_deterministic() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    let model_dir = dir.path().join("model");
    write_training_dataset(&data_path, 50);

    let p = pipeline(5000);
    p.train_classification("m1", &data_path, &model_dir).unwrap();

    // Requested iterations are ignored when re-testing a fixed model
    let first = p
        .evaluate_classification("m1", 0.3, 25, &data_path, dir.path(), Some(&model_dir))
        .unwrap();
    let second = p
        .evaluate_classification("m1", 0.3, 1, &data_path, dir.path(), Some(&model_dir))
        .unwrap();

    assert_eq!(first.score, second.score);
    assert_eq!(first.status, STATUS_OK, "diagnostics: {:?}", first.info);
    assert!(first.score.unwrap() >= 0.9);
}

#[test]
fn test_memory_guard_truncates_and_annotates() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    write_training_dataset(&data_path, 100);

    // Budget admits roughly 40 of the 200 rows (3 values per row)
    let limited = Pipeline::new(
        PipelineConfig::new()
            .with_random_state(42)
            .with_memory_budget(40 * 3 * MEMORY_COST_PER_VALUE),
    );
    let result = limited
        .evaluate_classification("m1", 0.3, 2, &data_path, dir.path(), None)
        .unwrap();
    assert!(
        result.info.iter().any(|m| m.contains("memory budget")),
        "expected a budget diagnostic, got {:?}",
        result.info
    );

    // Skipping the guard buffers the full set and drops the note
    let unlimited = Pipeline::new(
        PipelineConfig::new()
            .with_random_state(42)
            .with_memory_budget(40 * 3 * MEMORY_COST_PER_VALUE)
            .with_skip_memory_guard(true),
    );
    let result = unlimited
        .evaluate_classification("m1", 0.3, 2, &data_path, dir.path(), None)
        .unwrap();
    assert!(!result.info.iter().any(|m| m.contains("memory budget")));
}

#[test]
fn test_export_import_export_keeps_predictive_behavior() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let predict_path = dir.path().join("predict.csv");
    let model_dir = dir.path().join("model");
    let imported_dir = dir.path().join("imported");

    write_training_dataset(&train_path, 40);
    write_prediction_dataset(&predict_path, 12);

    let p = pipeline(5000);
    p.train_classification("m1", &train_path, &model_dir).unwrap();
    let original = p.classify("m1", &predict_path, &model_dir).unwrap();

    let exported = p.export_model("m1", &model_dir).unwrap();
    assert!(p.import_model("m1", &imported_dir, &exported).unwrap());
    let reexported = p.export_model("m1", &imported_dir).unwrap();
    assert_eq!(reexported, imported_dir);

    let roundtripped = p.classify("m1", &predict_path, &imported_dir).unwrap();
    assert_eq!(original.predictions, roundtripped.predictions);
}

#[test]
fn test_failed_import_keeps_destination_checksum() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let model_dir = dir.path().join("model");
    let bad_dir = dir.path().join("bad");

    write_training_dataset(&train_path, 20);
    let p = pipeline(5000);
    p.train_classification("m1", &train_path, &model_dir).unwrap();
    let before = fs::read(model_dir.join(MODEL_FILENAME)).unwrap();

    fs::create_dir_all(&bad_dir).unwrap();
    fs::write(
        bad_dir.join(MODEL_FILENAME),
        b"{\"format\":1,\"algorithm\":\"sgd-ovr-logistic\",\"classifier\":null,\"extra\":\"$(rm -rf /)\"}",
    )
    .unwrap();

    assert!(!p.import_model("m1", &model_dir, &bad_dir).unwrap());
    let after = fs::read(model_dir.join(MODEL_FILENAME)).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_clear_model_and_delete_output_dir() {
    let dir = tempdir().unwrap();
    let train_path = dir.path().join("train.csv");
    let model_dir = dir.path().join("model");
    write_training_dataset(&train_path, 10);

    let p = pipeline(5000);
    p.train_classification("m1", &train_path, &model_dir).unwrap();
    assert!(ModelStore::exists(&model_dir));

    p.clear_model("m1", &model_dir).unwrap();
    assert!(!ModelStore::exists(&model_dir));

    p.delete_output_dir(&model_dir).unwrap();
    assert!(!model_dir.exists());
}
