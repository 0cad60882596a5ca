//! Automation detector: known tool fingerprints in the user-agent string.

use super::types::{FindingKind, SecurityFinding, Severity};
use super::RuleDetector;
use crate::batch::BatchContext;

/// Substrings indicating automated clients, matched case-insensitively.
/// First match wins: one finding per record.
pub const AUTOMATION_INDICATORS: &[&str] =
    &["curl", "wget", "python", "postman", "bot", "spider", "crawler"];

pub struct AutomationDetector;

impl RuleDetector for AutomationDetector {
    fn name(&self) -> &'static str {
        "automation"
    }

    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let user_agent = record.user_agent.to_lowercase();
            let Some(indicator) = AUTOMATION_INDICATORS
                .iter()
                .find(|i| user_agent.contains(*i))
            else {
                continue;
            };
            let confidence = ctx.policy.finding_confidence(
                FindingKind::AutomationDetected,
                Severity::Medium,
                None,
            );
            findings.push(SecurityFinding {
                kind: FindingKind::AutomationDetected,
                severity: Severity::Medium,
                confidence,
                record_id: record.id,
                record_index: index,
                src_ip: record.src_ip.clone(),
                domain: None,
                user_agent: Some(record.user_agent.clone()),
                pattern: format!("Automation tool detected: {indicator}"),
                description: format!(
                    "Automated request detected with User-Agent containing '{indicator}'"
                ),
                explanation: format!(
                    "User-Agent contains '{indicator}', indicating automated request rather than normal browser traffic"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::ConfidencePolicy;
    use crate::record::{Action, LogRecord};
    use chrono::{TimeZone, Utc};

    fn record(user_agent: &str) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            "192.168.1.7",
            "10.0.0.1",
            "example.com",
            Action::Allowed,
            "GET",
            "200",
            user_agent,
            "100 100",
        )
    }

    #[test]
    fn test_curl_flagged_once() {
        let records = vec![record("curl/7.68.0"), record("Mozilla/5.0")];
        let policy = ConfidencePolicy::default();
        let ctx = BatchContext::new(&records, &policy);
        let findings = AutomationDetector.evaluate(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].pattern, "Automation tool detected: curl");
    }

    #[test]
    fn test_case_insensitive_first_match_wins() {
        // "Python-Bot/1.0" contains both "python" and "bot"; "python" comes
        // first in the indicator list.
        let records = vec![record("Python-Bot/1.0")];
        let policy = ConfidencePolicy::default();
        let ctx = BatchContext::new(&records, &policy);
        let findings = AutomationDetector.evaluate(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].pattern.contains("python"));
    }

    #[test]
    fn test_browser_not_flagged() {
        let records = vec![record("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")];
        let policy = ConfidencePolicy::default();
        let ctx = BatchContext::new(&records, &policy);
        assert!(AutomationDetector.evaluate(&ctx).is_empty());
    }
}
