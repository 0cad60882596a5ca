//! Reasoning Generator
//!
//! Produces plain-language justification strings for a verdict. Checks run
//! in a fixed order so the same record always yields the same reason list,
//! and the first reason doubles as the basis for statistical-only threat
//! categorization.

use crate::batch::ByteStats;
use crate::record::LogRecord;
use crate::rules::types::SecurityFinding;
use crate::stats::StatisticalFlag;

/// User-agent prefixes considered ordinary browser traffic.
pub const COMMON_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0",
    "Chrome/91.0",
    "Safari/13.1",
    "Edge/18.18363",
    "Mozilla/4.0",
    "Opera/9.80",
    "MSIE 10.0",
    "Trident/7.0",
];

/// Domain substrings that directly imply a threat.
const HIGH_RISK_KEYWORDS: &[&str] = &["malware", "phishing", "suspicious"];

/// Status codes considered routine; anything else below 400 is rare.
const ROUTINE_STATUS_CODES: &[u32] = &[200, 301, 302];

/// Absolute byte count above which a transfer is called out regardless of
/// the batch baseline.
const LARGE_TRANSFER_BYTES: u64 = 10_000;

/// Build the ordered reason list for one record.
///
/// Record-level observations come first, then rule-finding explanations,
/// then statistical model attributions. The list is never empty for a record
/// with at least one finding or flag.
pub fn record_reasons(
    record: &LogRecord,
    byte_stats: &ByteStats,
    findings: &[SecurityFinding],
    flag: &StatisticalFlag,
) -> Vec<String> {
    let mut reasons = Vec::new();

    let status = record.status_code_num();
    if status >= 400 {
        reasons.push(format!("Unusual status code: {status}"));
    } else if status == 0 {
        reasons.push("Invalid or missing status code".to_string());
    } else if !ROUTINE_STATUS_CODES.contains(&status) {
        reasons.push(format!("Rare status code: {status}"));
    }

    let (sent, received) = record.byte_counts();
    if (sent as f64) > byte_stats.sent_threshold() {
        reasons.push(format!("Unusual data volume: {sent} bytes sent"));
    } else if (sent as f64) < byte_stats.mean_sent - 2.0 * byte_stats.std_sent {
        reasons.push(format!("Unusually low data volume: {sent} bytes sent"));
    }
    if (received as f64) > byte_stats.received_threshold() {
        reasons.push(format!("Unusual data volume: {received} bytes received"));
    } else if (received as f64) < byte_stats.mean_received - 2.0 * byte_stats.std_received {
        reasons.push(format!(
            "Unusually low data volume: {received} bytes received"
        ));
    }
    if sent > LARGE_TRANSFER_BYTES || received > LARGE_TRANSFER_BYTES {
        reasons.push(format!(
            "Unusually large data transfer ({sent} sent, {received} received)"
        ));
    } else if sent == 0 && received == 0 {
        reasons.push("No data transfer detected".to_string());
    }

    let domain = record.domain.to_lowercase();
    for keyword in HIGH_RISK_KEYWORDS {
        if domain.contains(keyword) {
            reasons.push(format!(
                "Domain name contains high-risk keyword: '{keyword}'"
            ));
            break;
        }
    }

    if record.action.is_blocked() {
        reasons.push("Request was blocked by security policy".to_string());
    }

    let user_agent = &record.user_agent;
    let ua_lower = user_agent.to_lowercase();
    if !COMMON_USER_AGENTS.iter().any(|c| user_agent.contains(c)) {
        reasons.push(format!("Rare user agent: {user_agent}"));
    }
    if ua_lower.contains("curl") || ua_lower.contains("wget") {
        reasons.push("Command-line download tool in user agent".to_string());
    } else if ua_lower.contains("python") {
        reasons.push("Python script user agent detected".to_string());
    }

    for finding in findings {
        reasons.push(finding.explanation.clone());
    }

    reasons.extend(isolation_reasons(flag));
    reasons.extend(lof_reasons(flag));

    reasons
}

/// Reasons attributed to the isolation forest for one record.
pub fn isolation_reasons(flag: &StatisticalFlag) -> Vec<String> {
    if flag.isolation {
        vec![format!(
            "Isolation Forest isolated this record quickly (anomaly score {:.3})",
            flag.isolation_score
        )]
    } else {
        Vec::new()
    }
}

/// Reasons attributed to the LOF model for one record.
pub fn lof_reasons(flag: &StatisticalFlag) -> Vec<String> {
    if flag.lof {
        vec![format!(
            "Local density is far below that of its neighbors (LOF score {:.3})",
            flag.lof_score
        )]
    } else {
        Vec::new()
    }
}

/// Derive a threat category from reason text, for verdicts with no rule
/// finding to categorize them. Checks run in priority order.
pub fn map_reasons_to_category(reasons: &[String]) -> &'static str {
    let joined = reasons.join(" ").to_lowercase();
    if joined.contains("data volume") || joined.contains("data transfer") {
        "Unusual Data Volume"
    } else if joined.contains("status code") {
        "Unusual Status Code"
    } else if joined.contains("rare user agent") {
        "Rare User Agent"
    } else if joined.contains("command-line") || joined.contains("python script") {
        "Automation/Bot"
    } else if joined.contains("high-risk keyword") {
        "Malware/Phishing"
    } else if joined.contains("blocked") {
        "Blocked Request"
    } else {
        "Unusual Pattern"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Action;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record(
        domain: &str,
        action: Action,
        status: &str,
        user_agent: &str,
        bytes: &str,
    ) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            "192.168.1.5",
            "10.0.0.1",
            domain,
            action,
            "GET",
            status,
            user_agent,
            bytes,
        )
    }

    fn no_flag() -> StatisticalFlag {
        StatisticalFlag {
            record_id: Uuid::new_v4(),
            record_index: 0,
            isolation: false,
            lof: false,
            isolation_score: 0.0,
            lof_score: 0.0,
        }
    }

    fn stats() -> ByteStats {
        ByteStats {
            mean_sent: 1000.0,
            mean_received: 1000.0,
            std_sent: 100.0,
            std_received: 100.0,
        }
    }

    #[test]
    fn test_reason_order_is_fixed() {
        let r = record(
            "malware-drop.example",
            Action::Blocked,
            "403",
            "curl/7.68.0",
            "5000 100",
        );
        let reasons = record_reasons(&r, &stats(), &[], &no_flag());
        assert_eq!(reasons[0], "Unusual status code: 403");
        assert_eq!(reasons[1], "Unusual data volume: 5000 bytes sent");
        assert_eq!(reasons[2], "Unusually low data volume: 100 bytes received");
        assert_eq!(
            reasons[3],
            "Domain name contains high-risk keyword: 'malware'"
        );
        assert_eq!(reasons[4], "Request was blocked by security policy");
        assert_eq!(reasons[5], "Rare user agent: curl/7.68.0");
        assert_eq!(reasons[6], "Command-line download tool in user agent");
    }

    #[test]
    fn test_unremarkable_record_produces_no_reasons() {
        let r = record(
            "example.com",
            Action::Allowed,
            "200",
            "Mozilla/5.0 (Windows NT 10.0)",
            "1000 1000",
        );
        let reasons = record_reasons(&r, &stats(), &[], &no_flag());
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_invalid_status_and_zero_transfer_called_out() {
        let r = record("solo.net", Action::Allowed, "???", "WeirdAgent/1.0", "0 0");
        let flag = StatisticalFlag {
            isolation: true,
            isolation_score: 0.72,
            ..no_flag()
        };
        let reasons = record_reasons(&r, &stats(), &[], &flag);
        assert_eq!(reasons[0], "Invalid or missing status code");
        assert_eq!(reasons[1], "Unusually low data volume: 0 bytes sent");
        assert_eq!(reasons[2], "Unusually low data volume: 0 bytes received");
        assert_eq!(reasons[3], "No data transfer detected");
        assert_eq!(reasons[4], "Rare user agent: WeirdAgent/1.0");
        assert!(reasons[5].contains("Isolation Forest"));
    }

    #[test]
    fn test_rare_but_valid_status_code() {
        let r = record("example.com", Action::Allowed, "204", "Mozilla/5.0", "1000 1000");
        let reasons = record_reasons(&r, &stats(), &[], &no_flag());
        assert_eq!(reasons, vec!["Rare status code: 204".to_string()]);
        // Routine redirects stay quiet.
        let r = record("example.com", Action::Allowed, "301", "Mozilla/5.0", "1000 1000");
        assert!(record_reasons(&r, &stats(), &[], &no_flag()).is_empty());
    }

    #[test]
    fn test_large_transfer_absolute_check() {
        let r = record(
            "example.com",
            Action::Allowed,
            "200",
            "Mozilla/5.0",
            "15000 1000",
        );
        let reasons = record_reasons(&r, &stats(), &[], &no_flag());
        assert!(reasons
            .iter()
            .any(|x| x == "Unusually large data transfer (15000 sent, 1000 received)"));
    }

    #[test]
    fn test_statistical_reasons_appended() {
        let r = record("example.com", Action::Allowed, "200", "Mozilla/5.0", "1000 1000");
        let flag = StatisticalFlag {
            isolation: true,
            lof: true,
            isolation_score: 0.81,
            lof_score: 2.4,
            ..no_flag()
        };
        let reasons = record_reasons(&r, &stats(), &[], &flag);
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("Isolation Forest"));
        assert!(reasons[0].contains("0.810"));
        assert!(reasons[1].contains("LOF score"));
    }

    #[test]
    fn test_category_priority() {
        let reasons = vec![
            "Unusual data volume: 5000 bytes sent".to_string(),
            "Unusual status code: 500".to_string(),
        ];
        assert_eq!(map_reasons_to_category(&reasons), "Unusual Data Volume");

        let reasons = vec!["Rare user agent: weird/1.0".to_string()];
        assert_eq!(map_reasons_to_category(&reasons), "Rare User Agent");

        let reasons = vec!["Isolation Forest isolated this record quickly".to_string()];
        assert_eq!(map_reasons_to_category(&reasons), "Unusual Pattern");
    }
}
