//! Classification quality metrics
//!
//! Per-class precision/recall/F1 with support counts, the weighted
//! averages used as evaluation scores, and the score-set statistics the
//! evaluator's verdict is built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Precision/recall/F1 for one class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

/// Per-class scores plus support-weighted averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    per_class: BTreeMap<i64, ClassScores>,
    n_samples: usize,
}

impl ClassificationReport {
    /// Build a report from true and predicted labels.
    /// Classes appearing only in predictions get zero support and do not
    /// contribute to the weighted averages.
    pub fn compute(y_true: &[i64], y_pred: &[i64]) -> Self {
        let n_samples = y_true.len().min(y_pred.len());

        let mut tp: BTreeMap<i64, usize> = BTreeMap::new();
        let mut fp: BTreeMap<i64, usize> = BTreeMap::new();
        let mut fn_: BTreeMap<i64, usize> = BTreeMap::new();
        let mut support: BTreeMap<i64, usize> = BTreeMap::new();

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            *support.entry(t).or_insert(0) += 1;
            if t == p {
                *tp.entry(t).or_insert(0) += 1;
            } else {
                *fp.entry(p).or_insert(0) += 1;
                *fn_.entry(t).or_insert(0) += 1;
            }
        }

        let mut per_class = BTreeMap::new();
        let mut labels: Vec<i64> = support.keys().copied().collect();
        labels.extend(fp.keys().copied());
        labels.sort_unstable();
        labels.dedup();

        for label in labels {
            let tp_c = *tp.get(&label).unwrap_or(&0) as f64;
            let fp_c = *fp.get(&label).unwrap_or(&0) as f64;
            let fn_c = *fn_.get(&label).unwrap_or(&0) as f64;

            let precision = if tp_c + fp_c > 0.0 { tp_c / (tp_c + fp_c) } else { 0.0 };
            let recall = if tp_c + fn_c > 0.0 { tp_c / (tp_c + fn_c) } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.insert(
                label,
                ClassScores {
                    precision,
                    recall,
                    f1,
                    support: *support.get(&label).unwrap_or(&0),
                },
            );
        }

        Self { per_class, n_samples }
    }

    /// Scores for one class, if it occurred
    pub fn class(&self, label: i64) -> Option<&ClassScores> {
        self.per_class.get(&label)
    }

    fn weighted<F: Fn(&ClassScores) -> f64>(&self, metric: F) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        self.per_class
            .values()
            .map(|scores| metric(scores) * scores.support as f64)
            .sum::<f64>()
            / self.n_samples as f64
    }

    /// F1 averaged over classes, weighted by class support
    pub fn weighted_f1(&self) -> f64 {
        self.weighted(|s| s.f1)
    }

    /// Precision averaged over classes, weighted by class support
    pub fn weighted_precision(&self) -> f64 {
        self.weighted(|s| s.precision)
    }

    /// Recall averaged over classes, weighted by class support
    pub fn weighted_recall(&self) -> f64 {
        self.weighted(|s| s.recall)
    }
}

/// Arithmetic mean of a score set; 0 when empty
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of a score set; 0 for fewer than two scores
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|&v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![0, 0, 1, 1, 1];
        let report = ClassificationReport::compute(&y, &y);

        assert!((report.weighted_f1() - 1.0).abs() < 1e-12);
        assert!((report.weighted_precision() - 1.0).abs() < 1e-12);
        assert_eq!(report.class(1).unwrap().support, 3);
    }

    #[test]
    fn test_known_confusion() {
        // Class 0: tp=2 fp=0 fn=1, class 1: tp=1 fp=1 fn=0
        let y_true = vec![0, 0, 0, 1];
        let y_pred = vec![0, 0, 1, 1];
        let report = ClassificationReport::compute(&y_true, &y_pred);

        let c0 = report.class(0).unwrap();
        assert!((c0.precision - 1.0).abs() < 1e-12);
        assert!((c0.recall - 2.0 / 3.0).abs() < 1e-12);

        let c1 = report.class(1).unwrap();
        assert!((c1.precision - 0.5).abs() < 1e-12);
        assert!((c1.recall - 1.0).abs() < 1e-12);

        // weighted f1 = (3 * 0.8 + 1 * (2/3)) / 4
        let expected = (3.0 * 0.8 + 2.0 / 3.0) / 4.0;
        assert!((report.weighted_f1() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_predicted_only_class_has_zero_weight() {
        let y_true = vec![0, 0];
        let y_pred = vec![0, 5];
        let report = ClassificationReport::compute(&y_true, &y_pred);

        assert_eq!(report.class(5).unwrap().support, 0);
        // Weighted averages come from class 0 alone
        assert!((report.weighted_recall() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_and_deviation() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[0.5, 0.7]) - 0.6).abs() < 1e-12);

        assert_eq!(population_std_dev(&[0.9]), 0.0);
        // Population deviation of [2, 4] is 1
        assert!((population_std_dev(&[2.0, 4.0]) - 1.0).abs() < 1e-12);
    }
}
