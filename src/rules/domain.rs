//! Domain reputation detector: suspicious TLDs, typosquats, and
//! random-looking hostnames.

use super::types::{FindingKind, SecurityFinding, Severity};
use super::RuleDetector;
use crate::batch::BatchContext;

/// TLDs disproportionately used for throwaway/malicious hosting.
pub const SUSPICIOUS_TLDS: &[&str] = &[".xyz", ".top", ".cc", ".tk", ".ml", ".ga", ".cf"];

/// Known-brand typosquat variants: (brand substring, leet/typo variants).
const TYPOSQUAT_PATTERNS: &[(&str, &[&str])] = &[
    ("google", &["g00gle", "go0gle", "gogle", "gooogle"]),
    ("facebook", &["facebo0k", "faceb00k", "fasebook", "facebok"]),
    ("amazon", &["amaz0n", "amazoon", "amazn"]),
    ("microsoft", &["m1crosoft", "micros0ft", "m1cr0s0ft", "microsft"]),
    ("paypal", &["paypa1", "paypall"]),
    ("apple", &["app1e", "appel"]),
];

/// Maximum dot-separated labels before a domain counts as suspicious.
const MAX_LABEL_DOTS: usize = 2;

/// Length and digit-ratio bounds for the "random-looking" check.
const RANDOM_MIN_LEN: usize = 20;
const RANDOM_DIGIT_RATIO: f64 = 0.3;

/// Why a domain is suspicious, first matching reason wins. `None` when clean.
pub fn suspicious_reason(domain: &str) -> Option<String> {
    let lower = domain.to_lowercase();

    for tld in SUSPICIOUS_TLDS {
        if lower.ends_with(tld) {
            return Some(format!("Suspicious TLD: {tld}"));
        }
    }

    for (brand, variants) in TYPOSQUAT_PATTERNS {
        if lower.contains(brand) {
            for variant in *variants {
                if lower.contains(variant) {
                    return Some(format!("Typosquatting: {brand} -> {variant}"));
                }
            }
        }
    }

    if lower.matches('.').count() > MAX_LABEL_DOTS {
        return Some("Excessive subdomains".to_string());
    }

    if domain.len() > RANDOM_MIN_LEN {
        let digits = domain.chars().filter(|c| c.is_ascii_digit()).count();
        if digits as f64 > domain.len() as f64 * RANDOM_DIGIT_RATIO {
            return Some("Random-looking domain with many numbers".to_string());
        }
    }

    None
}

pub struct DomainReputationDetector;

impl RuleDetector for DomainReputationDetector {
    fn name(&self) -> &'static str {
        "domain_reputation"
    }

    fn evaluate(&self, ctx: &BatchContext<'_>) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let Some(reason) = suspicious_reason(&record.domain) else {
                continue;
            };
            let confidence = ctx.policy.finding_confidence(
                FindingKind::SuspiciousDomain,
                Severity::High,
                None,
            );
            findings.push(SecurityFinding {
                kind: FindingKind::SuspiciousDomain,
                severity: Severity::High,
                confidence,
                record_id: record.id,
                record_index: index,
                src_ip: record.src_ip.clone(),
                domain: Some(record.domain.clone()),
                user_agent: None,
                pattern: format!("Suspicious domain: {}", record.domain),
                description: format!("Domain shows suspicious characteristics: {reason}"),
                explanation: format!(
                    "Domain '{}' shows suspicious characteristics: {reason}. This could indicate a malicious or phishing site.",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspicious_tld() {
        assert_eq!(
            suspicious_reason("freestuff.xyz").as_deref(),
            Some("Suspicious TLD: .xyz")
        );
        assert_eq!(
            suspicious_reason("evil.tk").as_deref(),
            Some("Suspicious TLD: .tk")
        );
    }

    #[test]
    fn test_typosquat() {
        let reason = suspicious_reason("login.g00gle.com").unwrap();
        assert!(reason.contains("google"));
        assert!(reason.contains("g00gle"));
        // Legitimate brand domain is clean.
        assert!(suspicious_reason("google.com").is_none());
    }

    #[test]
    fn test_excessive_subdomains() {
        assert_eq!(
            suspicious_reason("a.b.c.example.com").as_deref(),
            Some("Excessive subdomains")
        );
        assert!(suspicious_reason("www.example.com").is_none());
    }

    #[test]
    fn test_random_looking_domain() {
        // 22 chars, 9 digits -> ratio > 0.3
        let reason = suspicious_reason("x4k9z2m8q1w5e7r3t6y.io").unwrap();
        assert_eq!(reason, "Random-looking domain with many numbers");
        // Long but mostly letters is fine.
        assert!(suspicious_reason("averylongbutnormaldomain.com").is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        // Both a suspicious TLD and excessive subdomains; TLD check runs first.
        let reason = suspicious_reason("a.b.c.evil.xyz").unwrap();
        assert!(reason.starts_with("Suspicious TLD"));
    }
}
