//! Security Rule Engine
//!
//! Five independent heuristic detectors run over the whole batch in a fixed
//! order. Each is a strategy object behind [`RuleDetector`], selected by
//! iteration rather than conditional dispatch, so every heuristic stays
//! independently testable.
//!
//! Containment policy: a failure inside one detector degrades that detector
//! to "no findings" and the run continues.

use std::panic::{catch_unwind, AssertUnwindSafe};

pub mod automation;
pub mod brute_force;
pub mod domain;
pub mod exfiltration;
pub mod rarity;
pub mod types;

pub use types::{FindingKind, SecurityFinding, Severity};

use crate::batch::BatchContext;

/// One heuristic detector over the whole batch. Implementations must process
/// records in batch order so outputs are reproducible.
pub trait RuleDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding>;
}

/// The fixed, ordered detector bank.
pub fn detectors() -> Vec<Box<dyn RuleDetector>> {
    vec![
        Box::new(brute_force::BruteForceDetector),
        Box::new(automation::AutomationDetector),
        Box::new(domain::DomainReputationDetector),
        Box::new(rarity::RarityDetector),
        Box::new(exfiltration::ExfiltrationDetector),
    ]
}

/// Run every detector, containing per-detector failures.
pub fn run_all(ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
    let mut findings = Vec::new();
    for detector in detectors() {
        match catch_unwind(AssertUnwindSafe(|| detector.evaluate(ctx))) {
            Ok(mut batch) => findings.append(&mut batch),
            Err(_) => {
                log::warn!(
                    "rule detector '{}' failed; treating its output as empty",
                    detector.name()
                );
            }
        }
    }
    log::debug!("rule engine produced {} findings", findings.len());
    findings
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::ConfidencePolicy;
    use crate::record::{Action, LogRecord};
    use chrono::{TimeZone, Utc};

    fn record(src: &str, domain: &str, status: &str, user_agent: &str) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 2, 11, 0, 0).unwrap(),
            src,
            "10.0.0.1",
            domain,
            Action::Allowed,
            "GET",
            status,
            user_agent,
            "500 500",
        )
    }

    #[test]
    fn test_detector_order_is_fixed() {
        let names: Vec<_> = detectors().iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "brute_force",
                "automation",
                "domain_reputation",
                "rarity",
                "exfiltration"
            ]
        );
    }

    #[test]
    fn test_record_can_accumulate_multiple_findings() {
        // One record that is both automated and hits a rare suspicious domain.
        let records = vec![
            record("1.1.1.1", "common.com", "200", "Mozilla/5.0"),
            record("1.1.1.1", "common.com", "200", "Mozilla/5.0"),
            record("2.2.2.2", "payload.xyz", "200", "curl/7.68.0"),
        ];
        let policy = ConfidencePolicy::default();
        let ctx = BatchContext::new(&records, &policy);
        let findings = run_all(&ctx);
        let kinds: Vec<_> = findings
            .iter()
            .filter(|f| f.record_index == 2)
            .map(|f| f.kind)
            .collect();
        assert!(kinds.contains(&FindingKind::AutomationDetected));
        assert!(kinds.contains(&FindingKind::SuspiciousDomain));
        assert!(kinds.contains(&FindingKind::RareDomain));
    }

    #[test]
    fn test_run_all_deterministic() {
        let records = vec![
            record("1.1.1.1", "a.com", "403", "curl/7.68.0"),
            record("1.1.1.1", "b.com", "403", "Mozilla/5.0"),
            record("1.1.1.1", "c.com", "200", "Mozilla/5.0"),
        ];
        let policy = ConfidencePolicy::default();
        let ctx = BatchContext::new(&records, &policy);
        let a = run_all(&ctx);
        let b = run_all(&ctx);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.record_index, y.record_index);
            assert_eq!(x.pattern, y.pattern);
        }
    }
}
