//! Operation result object
//!
//! Status codes mirror the host contract: distinct bits composed by
//! addition, so one result can simultaneously report (say) a low score
//! and excessive deviation.

use serde::{Deserialize, Serialize};

/// Everything went fine
pub const STATUS_OK: u32 = 0;
/// The dataset had too few usable samples to train on
pub const STATUS_NO_DATASET: u32 = 2;
/// Mean evaluation score fell below the accepted minimum
pub const STATUS_LOW_SCORE: u32 = 4;
/// Not enough (or not stable enough) data to trust the evaluation
pub const STATUS_NOT_ENOUGH_DATA: u32 = 8;

/// One predicted label tied to the sample it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub sample_id: String,
    pub label: i64,
}

/// Outcome of one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Additive composition of `STATUS_*` codes
    pub status: u32,
    /// Human-readable diagnostics, in the order they were raised
    pub info: Vec<String>,
    /// Evaluation score (mean weighted F1), when the operation produces one
    pub score: Option<f64>,
    /// Ordered predictions; index matches input row position
    pub predictions: Vec<Prediction>,
}

impl PipelineResult {
    /// A clean OK result
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK,
            info: Vec::new(),
            score: None,
            predictions: Vec::new(),
        }
    }

    /// Compose another status code into this result
    pub fn add_status(&mut self, code: u32) {
        self.status += code;
    }

    /// Append a diagnostic message
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.info.push(message.into());
    }

    /// True when no failure or warning code was composed in
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}
