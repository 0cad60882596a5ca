//! Engine configuration.
//!
//! One struct carries every tunable for a run: statistical model knobs, the
//! confidence policy, and the optional narrative stage. Defaults reproduce
//! the calibrated production behavior; the sensitivity presets shift the
//! statistical models without touching the rule heuristics.

use serde::{Deserialize, Serialize};

use crate::fusion::ConfidencePolicy;
use crate::stats::OutlierEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fraction of the batch the statistical models may flag.
    pub contamination: f64,
    /// Isolation forest size.
    pub n_trees: usize,
    /// Per-tree subsample cap.
    pub sample_size: usize,
    /// LOF neighborhood size (clamped to batch size at run time).
    pub k_neighbors: usize,
    /// RNG seed; fixed so repeated runs agree.
    pub seed: u64,
    /// Confidence fusion policy.
    pub policy: ConfidencePolicy,
    /// Whether to attempt the narrative stage after analysis.
    pub narrative_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            n_trees: 100,
            sample_size: 256,
            k_neighbors: 20,
            seed: 42,
            policy: ConfidencePolicy::default(),
            narrative_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Flags more of the batch; for environments that prefer false positives
    /// over misses.
    pub fn high_sensitivity() -> Self {
        Self {
            contamination: 0.2,
            k_neighbors: 10,
            ..Self::default()
        }
    }

    /// Flags less of the batch; for noisy environments.
    pub fn low_sensitivity() -> Self {
        Self {
            contamination: 0.05,
            ..Self::default()
        }
    }

    /// The statistical engine this configuration describes.
    pub fn outlier_engine(&self) -> OutlierEngine {
        OutlierEngine {
            contamination: self.contamination,
            n_trees: self.n_trees,
            sample_size: self.sample_size,
            k_neighbors: self.k_neighbors,
            seed: self.seed,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
