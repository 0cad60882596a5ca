//! Per-run batch context.
//!
//! Grouping tables (per-source counts, domain frequency, byte statistics)
//! are built once per run and passed explicitly to every detector, so runs
//! stay isolated and reentrant. Nothing here outlives the run.

use std::collections::HashMap;

use crate::fusion::ConfidencePolicy;
use crate::record::LogRecord;

/// Batch-wide byte transfer statistics (population mean / stddev, with
/// unparsable byte fields counted as 0).
#[derive(Debug, Clone, Default)]
pub struct ByteStats {
    pub mean_sent: f64,
    pub mean_received: f64,
    pub std_sent: f64,
    pub std_received: f64,
}

impl ByteStats {
    pub fn compute(records: &[LogRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let n = records.len() as f64;
        let (mut sum_sent, mut sum_received) = (0.0, 0.0);
        for r in records {
            let (s, rcv) = r.byte_counts();
            sum_sent += s as f64;
            sum_received += rcv as f64;
        }
        let mean_sent = sum_sent / n;
        let mean_received = sum_received / n;

        let (mut var_sent, mut var_received) = (0.0, 0.0);
        for r in records {
            let (s, rcv) = r.byte_counts();
            var_sent += (s as f64 - mean_sent).powi(2);
            var_received += (rcv as f64 - mean_received).powi(2);
        }
        Self {
            mean_sent,
            mean_received,
            std_sent: (var_sent / n).sqrt(),
            std_received: (var_received / n).sqrt(),
        }
    }

    /// Exfiltration threshold per direction: mean + 2 stddev.
    pub fn sent_threshold(&self) -> f64 {
        self.mean_sent + 2.0 * self.std_sent
    }

    pub fn received_threshold(&self) -> f64 {
        self.mean_received + 2.0 * self.std_received
    }

    /// Largest directional z-score for a record's byte counts. Directions
    /// with zero variance contribute 0 rather than dividing by zero.
    pub fn max_deviation(&self, sent: u64, received: u64) -> f64 {
        let z_sent = if self.std_sent > 0.0 {
            (sent as f64 - self.mean_sent) / self.std_sent
        } else {
            0.0
        };
        let z_received = if self.std_received > 0.0 {
            (received as f64 - self.mean_received) / self.std_received
        } else {
            0.0
        };
        z_sent.max(z_received)
    }
}

/// Per-source request tallies used by the brute-force detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStats {
    pub total: usize,
    pub status_403: usize,
}

/// Everything a rule detector needs about the batch, built once per run.
pub struct BatchContext<'a> {
    pub records: &'a [LogRecord],
    pub policy: &'a ConfidencePolicy,
    source_stats: HashMap<&'a str, SourceStats>,
    domain_counts: HashMap<&'a str, usize>,
    pub byte_stats: ByteStats,
}

impl<'a> BatchContext<'a> {
    pub fn new(records: &'a [LogRecord], policy: &'a ConfidencePolicy) -> Self {
        let mut source_stats: HashMap<&str, SourceStats> = HashMap::new();
        let mut domain_counts: HashMap<&str, usize> = HashMap::new();
        for r in records {
            let entry = source_stats.entry(r.src_ip.as_str()).or_default();
            entry.total += 1;
            if r.status_code_num() == 403 {
                entry.status_403 += 1;
            }
            *domain_counts.entry(r.domain.as_str()).or_insert(0) += 1;
        }
        Self {
            records,
            policy,
            source_stats,
            domain_counts,
            byte_stats: ByteStats::compute(records),
        }
    }

    pub fn source_stats(&self, src_ip: &str) -> SourceStats {
        self.source_stats.get(src_ip).copied().unwrap_or_default()
    }

    pub fn domain_count(&self, domain: &str) -> usize {
        self.domain_counts.get(domain).copied().unwrap_or(0)
    }
}

// ============================================================================
// TESTS
// ============================================================================
