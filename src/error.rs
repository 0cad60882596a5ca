//! Engine error types.

use std::time::Duration;

/// Errors surfaced by the analysis engine.
///
/// Detector-internal failures are contained at the detector seam and never
/// reach this type; what remains is the input contract and the run lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The batch contained zero records. Fatal for the run, not retried.
    #[error("no data to analyze")]
    EmptyBatch,

    /// The caller-supplied deadline elapsed. No partial verdicts are kept.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    /// A background analysis task panicked or was cancelled.
    #[error("analysis task failed: {0}")]
    Task(String),
}
