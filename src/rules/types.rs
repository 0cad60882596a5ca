//! Rule engine types. No logic here - data structures only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordinal risk level for a finding or verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The five heuristic detection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    #[serde(rename = "brute_force_403")]
    BruteForce403,
    #[serde(rename = "automation_detected")]
    AutomationDetected,
    #[serde(rename = "suspicious_domain")]
    SuspiciousDomain,
    #[serde(rename = "rare_domain")]
    RareDomain,
    #[serde(rename = "data_exfiltration")]
    DataExfiltration,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::BruteForce403 => "brute_force_403",
            FindingKind::AutomationDetected => "automation_detected",
            FindingKind::SuspiciousDomain => "suspicious_domain",
            FindingKind::RareDomain => "rare_domain",
            FindingKind::DataExfiltration => "data_exfiltration",
        }
    }

    /// Human-facing threat category label for this finding type.
    pub fn threat_category(&self) -> &'static str {
        match self {
            FindingKind::BruteForce403 => "Brute Force",
            FindingKind::AutomationDetected => "Automation/Bot",
            FindingKind::SuspiciousDomain => "Malware/Phishing",
            FindingKind::RareDomain => "Unusual Activity",
            FindingKind::DataExfiltration => "Data Exfiltration",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One heuristic detection for one record. Produced fresh each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFinding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub severity: Severity,
    pub confidence: f64,
    pub record_id: Uuid,
    /// Index of the record in the batch (batch order is the stable order).
    pub record_index: usize,
    pub src_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Short pattern string, e.g. "Multiple 403 errors from 1.2.3.4 (2 out of 5 requests)".
    pub pattern: String,
    pub description: String,
    pub explanation: String,
    /// Standard deviations above the mean, for findings with statistical evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_deviations: Option<f64>,
}

// ============================================================================
// TESTS
// ============================================================================
