//! Pipeline configuration and the runtime readiness gate

use serde::{Deserialize, Serialize};

use crate::error::{BatchmlError, Result};

/// Rows accumulated per training/prediction batch
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Evaluation dataset buffering budget in bytes
pub const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 500 * 1024 * 1024;

/// Worst-case in-memory cost of one buffered scalar value.
/// Covers the numeric container plus collection overhead, not just the 8
/// payload bytes.
pub const MEMORY_COST_PER_VALUE: u64 = 128;

/// Mean evaluation score below which a model is flagged as low quality
pub const MIN_ACCEPTED_SCORE: f64 = 0.7;

/// Held-out fraction for each shuffled evaluation split
pub const TEST_FRACTION: f64 = 0.2;

/// Oldest host runtime the capability set supports
pub const MIN_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion { major: 0, minor: 1, patch: 0 };

/// Semantic version of the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl RuntimeVersion {
    /// Create a new version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse from string (e.g., "1.2.3")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(BatchmlError::Dataset(format!("Invalid version format: {}", s)));
        }

        let major = parts[0]
            .parse()
            .map_err(|_| BatchmlError::Dataset(format!("Invalid major version: {}", parts[0])))?;
        let minor = parts[1]
            .parse()
            .map_err(|_| BatchmlError::Dataset(format!("Invalid minor version: {}", parts[1])))?;
        let patch = parts[2]
            .parse()
            .map_err(|_| BatchmlError::Dataset(format!("Invalid patch version: {}", parts[2])))?;

        Ok(Self { major, minor, patch })
    }
}

impl std::fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Configuration shared by all pipeline operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows per batch for training and prediction
    pub batch_size: usize,
    /// Byte budget for the evaluator's in-memory dataset buffer
    pub memory_budget_bytes: u64,
    /// Disable the evaluator's memory-budget guard entirely
    pub skip_memory_guard: bool,
    /// Seed for evaluation splits; `None` draws from entropy
    pub random_state: Option<u64>,
    /// Host runtime version checked by the readiness gate; `None` uses
    /// this crate's own version
    pub runtime_version: Option<RuntimeVersion>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            skip_memory_guard: false,
            random_state: None,
            runtime_version: None,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rows per batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the evaluator's buffering budget
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    /// Disable or enable the evaluator's memory-budget guard
    pub fn with_skip_memory_guard(mut self, skip: bool) -> Self {
        self.skip_memory_guard = skip;
        self
    }

    /// Set a seed for reproducible evaluation splits
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Set the host runtime version checked by the readiness gate
    pub fn with_runtime_version(mut self, version: RuntimeVersion) -> Self {
        self.runtime_version = Some(version);
        self
    }

    /// Resolve the runtime version the readiness gate compares against
    pub fn effective_runtime_version(&self) -> Result<RuntimeVersion> {
        match self.runtime_version {
            Some(v) => Ok(v),
            None => RuntimeVersion::parse(env!("CARGO_PKG_VERSION")),
        }
    }
}
