//! Feature extraction: one log record in, one fixed-layout vector out.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
use crate::record::{Action, LogRecord};

/// Versioned feature vector derived 1:1 from a [`LogRecord`].
///
/// Ephemeral: recomputed per analysis run, never persisted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Extract the feature vector for a single record.
///
/// Pure and O(1); unparsable numeric fields read as 0 so the record stays in
/// the batch population.
pub fn extract(record: &LogRecord) -> FeatureVector {
    let (sent, received) = record.byte_counts();
    FeatureVector::from_values([
        record.status_code_num() as f64,
        sent as f64,
        received as f64,
        record.domain.len() as f64,
        record.user_agent.len() as f64,
        if record.action == Action::Blocked { 1.0 } else { 0.0 },
        if record.method.eq_ignore_ascii_case("POST") { 1.0 } else { 0.0 },
    ])
}

/// Assemble the batch feature matrix, one row per record in batch order.
pub fn batch_matrix(records: &[LogRecord]) -> Array2<f64> {
    let mut matrix = Array2::zeros((records.len(), FEATURE_COUNT));
    for (i, record) in records.iter().enumerate() {
        let fv = extract(record);
        for (j, &v) in fv.values.iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }
    matrix
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(action: Action, method: &str, status: &str, bytes: &str) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            "192.168.1.2",
            "10.0.0.1",
            "example.com",
            action,
            method,
            status,
            "Mozilla/5.0",
            bytes,
        )
    }

    #[test]
    fn test_extract_basic() {
        let r = record(Action::Blocked, "POST", "403", "100 250");
        let fv = extract(&r);
        assert_eq!(fv.values[0], 403.0);
        assert_eq!(fv.values[1], 100.0);
        assert_eq!(fv.values[2], 250.0);
        assert_eq!(fv.values[3], "example.com".len() as f64);
        assert_eq!(fv.values[4], "Mozilla/5.0".len() as f64);
        assert_eq!(fv.values[5], 1.0);
        assert_eq!(fv.values[6], 1.0);
    }

    #[test]
    fn test_extract_unparsable_defaults_to_zero() {
        let r = record(Action::Allowed, "GET", "???", "not bytes");
        let fv = extract(&r);
        assert_eq!(fv.values[0], 0.0);
        assert_eq!(fv.values[1], 0.0);
        assert_eq!(fv.values[2], 0.0);
        assert_eq!(fv.values[5], 0.0);
        assert_eq!(fv.values[6], 0.0);
    }

    #[test]
    fn test_batch_matrix_preserves_order() {
        let records = vec![
            record(Action::Allowed, "GET", "200", "10 20"),
            record(Action::Blocked, "POST", "403", "30 40"),
        ];
        let m = batch_matrix(&records);
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), FEATURE_COUNT);
        assert_eq!(m[[0, 0]], 200.0);
        assert_eq!(m[[1, 0]], 403.0);
        assert_eq!(m[[1, 5]], 1.0);
    }
}
