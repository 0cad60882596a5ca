//! Brute-force detector: repeated 403s from a single source address.

use super::types::{FindingKind, SecurityFinding, Severity};
use super::RuleDetector;
use crate::batch::BatchContext;

/// Minimum requests from one source before the pattern is considered.
const MIN_GROUP_SIZE: usize = 3;

/// Minimum 403 responses within the group to flag.
const MIN_403_COUNT: usize = 2;

pub struct BruteForceDetector;

impl RuleDetector for BruteForceDetector {
    fn name(&self) -> &'static str {
        "brute_force"
    }

    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        // Iterate in batch order so output order is stable.
        for (index, record) in ctx.records.iter().enumerate() {
            if record.status_code_num() != 403 {
                continue;
            }
            let stats = ctx.source_stats(&record.src_ip);
            if stats.total < MIN_GROUP_SIZE || stats.status_403 < MIN_403_COUNT {
                continue;
            }
            let confidence =
                ctx.policy
                    .finding_confidence(FindingKind::BruteForce403, Severity::High, None);
            findings.push(SecurityFinding {
                kind: FindingKind::BruteForce403,
                severity: Severity::High,
                confidence,
                record_id: record.id,
                record_index: index,
                src_ip: record.src_ip.clone(),
                domain: None,
                user_agent: None,
                pattern: format!(
                    "Multiple 403 errors from {} ({} out of {} requests)",
                    record.src_ip, stats.status_403, stats.total
                ),
                description: format!(
                    "Potential brute force attack or scraping attempt from {}",
                    record.src_ip
                ),
                explanation: format!(
                    "IP {} generated {} 403 errors in {} requests, indicating potential brute force or scraping activity",
                    record.src_ip, stats.status_403, stats.total
                ),
                std_deviations: None,
            });
        }
        findings
    }
}

// ============================================================================
// TESTS
// ============================================================================
