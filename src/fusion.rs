//! Confidence fusion: merges heuristic findings and statistical flags for a
//! record into one verdict.
//!
//! The confidence table and its adjustment constants are empirically chosen
//! and carried as a configurable policy rather than hard-wired, so they can
//! be recalibrated without touching the fusion logic.

use serde::{Deserialize, Serialize};

use crate::reasoning;
use crate::record::LogRecord;
use crate::rules::types::{FindingKind, SecurityFinding, Severity};

// ============================================================================
// CONFIDENCE POLICY
// ============================================================================

/// Tunable confidence table. `Default` reproduces the calibrated values the
/// engine shipped with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    // Base confidence per finding type.
    pub base_brute_force: f64,
    pub base_automation: f64,
    pub base_suspicious_domain: f64,
    pub base_rare_domain: f64,
    pub base_exfiltration: f64,
    /// Base for records flagged only by the statistical engine.
    pub base_statistical: f64,

    // Severity adjustments.
    pub high_severity_bonus: f64,
    pub medium_severity_bonus: f64,

    // Statistical agreement adjustments.
    pub both_detectors_bonus: f64,
    pub single_detector_bonus: f64,

    // Byte-deviation evidence adjustments (exfiltration check).
    pub strong_deviation_bonus: f64,
    pub moderate_deviation_bonus: f64,

    // Statistical-only confidence levels.
    pub both_detectors_confidence: f64,
    pub single_detector_confidence: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base_brute_force: 0.85,
            base_automation: 0.75,
            base_suspicious_domain: 0.90,
            base_rare_domain: 0.60,
            base_exfiltration: 0.80,
            base_statistical: 0.70,
            high_severity_bonus: 0.10,
            medium_severity_bonus: 0.05,
            both_detectors_bonus: 0.15,
            single_detector_bonus: 0.05,
            strong_deviation_bonus: 0.10,
            moderate_deviation_bonus: 0.05,
            both_detectors_confidence: 0.85,
            single_detector_confidence: 0.70,
        }
    }
}

impl ConfidencePolicy {
    fn base(&self, kind: FindingKind) -> f64 {
        match kind {
            FindingKind::BruteForce403 => self.base_brute_force,
            FindingKind::AutomationDetected => self.base_automation,
            FindingKind::SuspiciousDomain => self.base_suspicious_domain,
            FindingKind::RareDomain => self.base_rare_domain,
            FindingKind::DataExfiltration => self.base_exfiltration,
        }
    }

    /// Confidence for one finding: base + severity bonus + deviation bonus,
    /// clamped to 1.0.
    pub fn finding_confidence(
        &self,
        kind: FindingKind,
        severity: Severity,
        std_deviations: Option<f64>,
    ) -> f64 {
        let mut confidence = self.base(kind);
        confidence += match severity {
            Severity::High => self.high_severity_bonus,
            Severity::Medium => self.medium_severity_bonus,
            Severity::Low => 0.0,
        };
        if let Some(d) = std_deviations {
            if d > 3.0 {
                confidence += self.strong_deviation_bonus;
            } else if d > 2.0 {
                confidence += self.moderate_deviation_bonus;
            }
        }
        confidence.min(1.0)
    }

    /// Extra confidence when the statistical detectors also flag the record.
    pub fn agreement_bonus(&self, isolation: bool, lof: bool) -> f64 {
        if isolation && lof {
            self.both_detectors_bonus
        } else if isolation || lof {
            self.single_detector_bonus
        } else {
            0.0
        }
    }

    /// Confidence attributed to the statistical engine alone.
    pub fn statistical_confidence(&self, isolation: bool, lof: bool) -> f64 {
        if isolation && lof {
            self.both_detectors_confidence
        } else if isolation || lof {
            self.single_detector_confidence
        } else {
            0.0
        }
    }
}

// ============================================================================
// VERDICT TYPES
// ============================================================================

/// Reasoning attributed to one statistical detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReasoning {
    pub flagged: bool,
    pub reasons: Vec<String>,
    pub feature_importance: Vec<f64>,
}

/// Per-detector reasoning breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictReasoning {
    pub isolation: ModelReasoning,
    pub lof: ModelReasoning,
}

/// Roll-up of how a verdict was detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub statistical_detected: bool,
    pub rules_detected: bool,
    pub highest_severity: Severity,
    pub detection_methods: Vec<String>,
}

/// The fused, final anomaly judgment for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub record: LogRecord,
    pub flagged_by_isolation: bool,
    pub flagged_by_lof: bool,
    pub confidence: f64,
    pub severity: Severity,
    pub threat_category: String,
    /// Combined ordered justification strings. Never empty.
    pub reasons: Vec<String>,
    pub model_reasoning: VerdictReasoning,
    pub findings: Vec<SecurityFinding>,
    pub summary: AnomalySummary,
}

/// Per-record input to fusion, assembled by the engine after both signal
/// sources have completed.
pub struct FusionInput<'a> {
    pub record: &'a LogRecord,
    pub findings: Vec<SecurityFinding>,
    pub flagged_by_isolation: bool,
    pub flagged_by_lof: bool,
    pub reasons: Vec<String>,
    pub isolation_reasons: Vec<String>,
    pub lof_reasons: Vec<String>,
    pub isolation_importance: Vec<f64>,
    pub lof_importance: Vec<f64>,
}

// ============================================================================
// FUSION
// ============================================================================

/// Fuse one record's signals into a verdict.
///
/// Returns `None` when the record has no findings and no statistical flags -
/// such records never produce a verdict.
pub fn fuse(input: FusionInput<'_>, policy: &ConfidencePolicy) -> Option<AnomalyVerdict> {
    let FusionInput {
        record,
        findings,
        flagged_by_isolation: iso,
        flagged_by_lof: lof,
        reasons,
        isolation_reasons,
        lof_reasons,
        isolation_importance,
        lof_importance,
    } = input;

    let statistical = iso || lof;
    if findings.is_empty() && !statistical {
        return None;
    }

    // Overall confidence: the statistical engine's own confidence vs. the
    // strongest rule finding boosted by statistical agreement.
    let statistical_confidence = policy.statistical_confidence(iso, lof);
    let rule_confidence = findings
        .iter()
        .map(|f| (f.confidence + policy.agreement_bonus(iso, lof)).min(1.0))
        .fold(0.0_f64, f64::max);
    let confidence = statistical_confidence.max(rule_confidence).clamp(0.0, 1.0);

    // Severity: rule findings dominate; otherwise derive from agreement and
    // confidence.
    let severity = if let Some(max) = findings.iter().map(|f| f.severity).max() {
        max
    } else if iso && lof {
        Severity::High
    } else if confidence > 0.8 {
        Severity::High
    } else if confidence > 0.6 {
        Severity::Medium
    } else {
        Severity::Low
    };

    // Threat category: first rule finding wins; statistical-only verdicts get
    // a category derived from the dominant reasoning string.
    let threat_category = if let Some(first) = findings.first() {
        first.kind.threat_category().to_string()
    } else {
        reasoning::map_reasons_to_category(&reasons).to_string()
    };

    let mut detection_methods = Vec::new();
    if statistical {
        detection_methods.push("statistical".to_string());
    }
    for f in &findings {
        detection_methods.push(f.kind.as_str().to_string());
    }

    Some(AnomalyVerdict {
        record: record.clone(),
        flagged_by_isolation: iso,
        flagged_by_lof: lof,
        confidence,
        severity,
        threat_category,
        reasons,
        model_reasoning: VerdictReasoning {
            isolation: ModelReasoning {
                flagged: iso,
                reasons: isolation_reasons,
                feature_importance: isolation_importance,
            },
            lof: ModelReasoning {
                flagged: lof,
                reasons: lof_reasons,
                feature_importance: lof_importance,
            },
        },
        findings,
        summary: AnomalySummary {
            statistical_detected: statistical,
            rules_detected: true,
            highest_severity: severity,
            detection_methods,
        },
    })
    .map(|mut v| {
        v.summary.rules_detected = !v.findings.is_empty();
        v
    })
}

// ============================================================================
// TESTS
// ============================================================================
