//! Classifier capability boundary
//!
//! The pipeline drives any model through this trait and never inspects
//! its internals; the only production implementation is the one-vs-rest
//! SGD classifier in [`sgd`].

mod sgd;

pub use sgd::{SgdClassifier, SgdConfig};

use ndarray::{Array1, Array2};

use crate::error::Result;

/// A trainable, predictable classification model.
///
/// Implementations own all mutable model state. `partial_fit` must accept
/// the full declared class list up front so incremental updates can begin
/// before every class has been observed in the data.
pub trait Classifier {
    /// Fit from scratch on the full sample set
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Incrementally update the model with one batch
    fn partial_fit(&mut self, x: &Array2<f64>, y: &Array1<i64>, classes: &[i64]) -> Result<()>;

    /// Predict a class label per sample row
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i64>>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
