//! One-vs-rest logistic regression trained by stochastic gradient descent
//!
//! Log-loss with L2 regularization and an inverse-scaling learning rate.
//! `partial_fit` warm-starts from the current weights, so repeated calls
//! over successive batches implement incremental training.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::error::{BatchmlError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgdConfig {
    /// Maximum passes over the data per fit/partial_fit call
    pub max_iter: usize,
    /// Base learning rate
    pub eta0: f64,
    /// L2 regularization strength
    pub alpha: f64,
    /// Inverse-scaling exponent for the learning rate schedule
    pub power_t: f64,
    /// Early-stopping tolerance on the epoch loss
    pub tol: f64,
    pub random_state: Option<u64>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            eta0: 0.05,
            alpha: 0.0001,
            power_t: 0.25,
            tol: 1e-4,
            random_state: Some(42),
        }
    }
}

/// Linear classifier with one weight vector per class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgdClassifier {
    pub config: SgdConfig,
    classes: Vec<i64>,
    weights: Option<Array2<f64>>,
    bias: Vec<f64>,
    /// Global update counter; persists across partial fits so the
    /// learning rate keeps decaying over the whole training history
    n_updates: u64,
}

impl SgdClassifier {
    pub fn new(config: SgdConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            weights: None,
            bias: Vec::new(),
            n_updates: 0,
        }
    }

    /// True once at least one fit/partial_fit call has run
    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    /// Classes the model currently knows, in declaration order
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn init(&mut self, classes: Vec<i64>, n_features: usize) -> Result<()> {
        if classes.len() < 2 {
            return Err(BatchmlError::Training(format!(
                "need at least 2 target classes, got {}",
                classes.len()
            )));
        }
        self.classes = classes;
        self.weights = Some(Array2::zeros((self.classes.len(), n_features)));
        self.bias = vec![0.0; self.classes.len()];
        self.n_updates = 0;
        Ok(())
    }

    fn class_indices(&self, y: &Array1<i64>) -> Result<Vec<usize>> {
        y.iter()
            .map(|label| {
                self.classes.iter().position(|c| c == label).ok_or_else(|| {
                    BatchmlError::Training(format!(
                        "target class {} is not in the declared class list",
                        label
                    ))
                })
            })
            .collect()
    }

    /// SGD epochs over `x`, one binary logistic problem per class
    fn train(&mut self, x: &Array2<f64>, y_idx: &[usize]) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(BatchmlError::Training("empty training batch".to_string()));
        }
        let n_classes = self.classes.len();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(
            self.config.random_state.unwrap_or(42).wrapping_add(self.n_updates),
        );
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;

        let weights = match self.weights.as_mut() {
            Some(w) => w,
            None => {
                return Err(BatchmlError::Training("model is not initialized".to_string()));
            }
        };
        if x.ncols() != weights.ncols() {
            return Err(BatchmlError::Training(format!(
                "sample has {} features, model expects {}",
                x.ncols(),
                weights.ncols()
            )));
        }

        for epoch in 0..self.config.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let lr = self.config.eta0
                    / (self.n_updates as f64 + 1.0).powf(self.config.power_t);

                for k in 0..n_classes {
                    let margin = xi.dot(&weights.row(k)) + self.bias[k];
                    let p = sigmoid(margin);
                    let y01 = if y_idx[i] == k { 1.0 } else { 0.0 };
                    let diff = p - y01;

                    epoch_loss +=
                        -(y01 * p.max(1e-15).ln() + (1.0 - y01) * (1.0 - p).max(1e-15).ln());

                    for j in 0..xi.len() {
                        let grad = diff * xi[j] + self.config.alpha * weights[[k, j]];
                        weights[[k, j]] -= lr * grad;
                    }
                    self.bias[k] -= lr * diff;
                }
                self.n_updates += 1;
            }

            epoch_loss /= n as f64;
            if (prev_loss - epoch_loss).abs() < self.config.tol && epoch > 0 {
                break;
            }
            prev_loss = epoch_loss;
        }

        Ok(())
    }
}

impl Classifier for SgdClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(BatchmlError::Training(format!(
                "{} samples but {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let mut classes: Vec<i64> = y.iter().copied().collect();
        classes.sort_unstable();
        classes.dedup();

        self.init(classes, x.ncols())?;
        let y_idx = self.class_indices(y)?;
        self.train(x, &y_idx)
    }

    fn partial_fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, classes: &[i64]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(BatchmlError::Training(format!(
                "{} samples but {} targets",
                x.nrows(),
                y.len()
            )));
        }

        if self.weights.is_none() {
            self.init(classes.to_vec(), x.ncols())?;
        } else if self.classes != classes {
            return Err(BatchmlError::Training(
                "declared class list changed between partial fits".to_string(),
            ));
        }

        let y_idx = self.class_indices(y)?;
        self.train(x, &y_idx)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| BatchmlError::Training("model is not fitted".to_string()))?;

        if x.ncols() != weights.ncols() {
            return Err(BatchmlError::Training(format!(
                "sample has {} features, model expects {}",
                x.ncols(),
                weights.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut best = 0usize;
                let mut best_margin = f64::NEG_INFINITY;
                for k in 0..self.classes.len() {
                    let margin = row.dot(&weights.row(k)) + self.bias[k];
                    if margin > best_margin {
                        best_margin = margin;
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn name(&self) -> &str {
        "sgd-ovr-logistic"
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
