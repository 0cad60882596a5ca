//! Statistical Outlier Engine
//!
//! Wraps the two unsupervised detectors (isolation forest and LOF) behind a
//! single deterministic entry point. Features are standardized before either
//! model sees them; the contamination fraction turns raw scores into flags.

pub mod isolation;
pub mod lof;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::{feature_name, FEATURE_COUNT};
use crate::record::LogRecord;
use isolation::IsolationForest;

/// Features with less spread than this are centered but not scaled.
const MIN_STD: f64 = 1e-10;

/// Statistical verdict for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalFlag {
    pub record_id: Uuid,
    pub record_index: usize,
    pub isolation: bool,
    pub lof: bool,
    pub isolation_score: f64,
    pub lof_score: f64,
}

impl StatisticalFlag {
    pub fn any(&self) -> bool {
        self.isolation || self.lof
    }
}

/// Output of one statistical run over a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    /// One entry per record, in batch order.
    pub flags: Vec<StatisticalFlag>,
    /// (feature name, weight) pairs, descending by weight.
    pub isolation_importance: Vec<(String, f64)>,
    pub lof_importance: Vec<(String, f64)>,
}

/// Configuration for one statistical run. All knobs are fixed up front so
/// repeated runs over the same batch are byte-identical.
#[derive(Debug, Clone)]
pub struct OutlierEngine {
    pub contamination: f64,
    pub n_trees: usize,
    pub sample_size: usize,
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for OutlierEngine {
    fn default() -> Self {
        OutlierEngine {
            contamination: 0.1,
            n_trees: 100,
            sample_size: 256,
            k_neighbors: 20,
            seed: 42,
        }
    }
}

impl OutlierEngine {
    /// Run both models over the batch. Batches with fewer than two records
    /// cannot support neighbor-based scoring and produce no flags.
    pub fn run(&self, records: &[LogRecord], matrix: &Array2<f64>) -> OutlierReport {
        let n = records.len();
        if n < 2 {
            log::warn!("batch of {n} record(s) is too small for statistical models");
            return OutlierReport {
                flags: records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| StatisticalFlag {
                        record_id: r.id,
                        record_index: i,
                        isolation: false,
                        lof: false,
                        isolation_score: 0.0,
                        lof_score: 0.0,
                    })
                    .collect(),
                isolation_importance: Vec::new(),
                lof_importance: Vec::new(),
            };
        }

        let standardized = standardize(matrix);

        let forest = IsolationForest::fit(
            &standardized,
            self.n_trees,
            self.sample_size,
            self.seed,
        );
        let isolation_scores = forest.score(&standardized);
        let lof_scores = lof::lof_scores(&standardized, self.k_neighbors);

        let iso_flags = flag_top(&isolation_scores, self.contamination);
        let lof_flags = flag_top(&lof_scores, self.contamination);

        let flags = records
            .iter()
            .enumerate()
            .map(|(i, r)| StatisticalFlag {
                record_id: r.id,
                record_index: i,
                isolation: iso_flags[i],
                lof: lof_flags[i],
                isolation_score: isolation_scores[i],
                lof_score: lof_scores[i],
            })
            .collect();

        OutlierReport {
            flags,
            isolation_importance: ranked_importance(forest.feature_importance()),
            lof_importance: ranked_importance(lof::feature_importance(
                &standardized,
                self.k_neighbors,
            )),
        }
    }
}

/// Center every column; scale only columns with real spread.
pub fn standardize(matrix: &Array2<f64>) -> Array2<f64> {
    let n = matrix.nrows();
    let mut out = matrix.clone();
    if n == 0 {
        return out;
    }
    for col in 0..matrix.ncols() {
        let mean = matrix.column(col).sum() / n as f64;
        let var = matrix
            .column(col)
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        let std = var.sqrt();
        for row in 0..n {
            out[[row, col]] -= mean;
            if std > MIN_STD {
                out[[row, col]] /= std;
            }
        }
    }
    out
}

/// Flag the `ceil(n * contamination)` highest-scoring rows, at least one
/// when contamination is positive. Ties resolve to the lower index.
fn flag_top(scores: &[f64], contamination: f64) -> Vec<bool> {
    let n = scores.len();
    let mut flags = vec![false; n];
    if n == 0 || contamination <= 0.0 {
        return flags;
    }
    let count = ((n as f64 * contamination).ceil() as usize).clamp(1, n);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    for &i in order.iter().take(count) {
        flags[i] = true;
    }
    flags
}

fn ranked_importance(weights: [f64; FEATURE_COUNT]) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| (feature_name(i).unwrap_or("unknown").to_string(), w))
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    pairs
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::batch_matrix;
    use crate::record::{Action, LogRecord};
    use chrono::{TimeZone, Utc};
    use ndarray::Array2;

    fn record(status: &str, bytes: &str) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            "192.168.1.5",
            "10.0.0.1",
            "example.com",
            Action::Allowed,
            "GET",
            status,
            "Mozilla/5.0",
            bytes,
        )
    }

    #[test]
    fn test_flag_top_count_and_ties() {
        let scores = vec![0.5, 0.9, 0.5, 0.9, 0.1];
        let flags = flag_top(&scores, 0.3);
        // ceil(5 * 0.3) = 2; the two 0.9s win, lower index first.
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_flag_top_floor_of_one() {
        let scores = vec![0.1, 0.2, 0.3];
        let flags = flag_top(&scores, 0.01);
        assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        assert!(flags[2]);
    }

    #[test]
    fn test_standardize_constant_column() {
        let m = Array2::from_elem((4, 2), 7.0);
        let s = standardize(&m);
        // Constant columns center to zero without dividing.
        for v in s.iter() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn test_tiny_batch_produces_no_flags() {
        let records = vec![record("200", "100 100")];
        let matrix = batch_matrix(&records);
        let report = OutlierEngine::default().run(&records, &matrix);
        assert_eq!(report.flags.len(), 1);
        assert!(!report.flags[0].any());
    }

    #[test]
    fn test_outlier_record_flagged() {
        let mut records: Vec<_> = (0..30).map(|_| record("200", "1000 1000")).collect();
        records.push(record("500", "900000 50"));
        let matrix = batch_matrix(&records);
        let report = OutlierEngine::default().run(&records, &matrix);
        assert!(report.flags[30].any());
        // Contamination 0.1 over 31 rows flags ceil(3.1) = 4 per model at most.
        let flagged = report.flags.iter().filter(|f| f.any()).count();
        assert!(flagged <= 8);
    }

    #[test]
    fn test_run_deterministic() {
        let mut records: Vec<_> = (0..20).map(|_| record("200", "1000 1000")).collect();
        records.push(record("403", "50000 10"));
        let matrix = batch_matrix(&records);
        let engine = OutlierEngine::default();
        let a = engine.run(&records, &matrix);
        let b = engine.run(&records, &matrix);
        for (x, y) in a.flags.iter().zip(b.flags.iter()) {
            assert_eq!(x.isolation, y.isolation);
            assert_eq!(x.lof, y.lof);
            assert_eq!(x.isolation_score, y.isolation_score);
            assert_eq!(x.lof_score, y.lof_score);
        }
        assert_eq!(a.isolation_importance, b.isolation_importance);
    }
}
