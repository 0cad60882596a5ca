//! Rarity detector: domains seen exactly once in the batch.

use super::types::{FindingKind, SecurityFinding, Severity};
use super::RuleDetector;
use crate::batch::BatchContext;

pub struct RarityDetector;

impl RuleDetector for RarityDetector {
    fn name(&self) -> &'static str {
        "rarity"
    }

    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            if ctx.domain_count(&record.domain) != 1 {
                continue;
            }
            let confidence =
                ctx.policy
                    .finding_confidence(FindingKind::RareDomain, Severity::Medium, None);
            findings.push(SecurityFinding {
                kind: FindingKind::RareDomain,
                severity: Severity::Medium,
                confidence,
                record_id: record.id,
                record_index: index,
                src_ip: record.src_ip.clone(),
                domain: Some(record.domain.clone()),
                user_agent: None,
                pattern: format!("Rare domain accessed: {}", record.domain),
                description: format!("Connection to rarely accessed domain: {}", record.domain),
                explanation: format!(
                    "Domain '{}' appears only once in the log, indicating unusual access pattern",
                    record.domain
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
