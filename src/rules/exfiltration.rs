//! Exfiltration detector: byte volumes far above the batch baseline.

use super::types::{FindingKind, SecurityFinding, Severity};
use super::RuleDetector;
use crate::batch::BatchContext;

pub struct ExfiltrationDetector;

impl RuleDetector for ExfiltrationDetector {
    fn name(&self) -> &'static str {
        "exfiltration"
    }

    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
        let stats = &ctx.byte_stats;
        let sent_threshold = stats.sent_threshold();
        let received_threshold = stats.received_threshold();

        let mut findings = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let (sent, received) = record.byte_counts();
            if (sent as f64) <= sent_threshold && (received as f64) <= received_threshold {
                continue;
            }
            let std_deviations = stats.max_deviation(sent, received);
            let confidence = ctx.policy.finding_confidence(
                FindingKind::DataExfiltration,
                Severity::High,
                Some(std_deviations),
            );
            findings.push(SecurityFinding {
                kind: FindingKind::DataExfiltration,
                severity: Severity::High,
                confidence,
                record_id: record.id,
                record_index: index,
                src_ip: record.src_ip.clone(),
                domain: Some(record.domain.clone()),
                user_agent: None,
                pattern: format!("Unusual data transfer: {sent} sent, {received} received"),
                description: format!(
                    "Potential data exfiltration - {sent} bytes sent, {received} bytes received (threshold: {sent_threshold:.0} sent, {received_threshold:.0} received)"
                ),
                explanation: format!(
                    "Data transfer of {sent} bytes sent and {received} bytes received is {std_deviations:.1} standard deviations above normal, indicating potential data exfiltration"
                ),
                std_deviations: Some(std_deviations),
            });
        }
        findings
    }
}

// ============================================================================
// TESTS
// ============================================================================
