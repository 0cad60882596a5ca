//! Aggregation Reporter
//!
//! Rolls a finished analysis up into dashboard-shaped data. Pure function of
//! its inputs: building the same dashboard twice from the same run yields
//! identical output, and building it never mutates the run.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fusion::AnomalyVerdict;
use crate::record::{Action, LogRecord};

/// How many entries the "top" lists carry.
const TOP_N: usize = 5;

/// How many anomalies the recent list carries.
const RECENT_N: usize = 10;

/// Shown when a verdict carries no reason text at all.
const NO_EXPLANATION: &str = "No specific explanation available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub allowed: usize,
    pub blocked: usize,
    pub other: usize,
}

/// Records and anomalies per UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub records: usize,
    pub anomalies: usize,
}

/// One row of the recent-anomalies table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentAnomaly {
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub domain: String,
    pub severity: String,
    pub confidence: f64,
    pub threat_category: String,
    pub explanation: String,
}

/// One record on the full chronological timeline. Every record of the batch
/// appears here, anomalous or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub bytes_sent: u64,
    pub src_ip: String,
    pub domain: String,
    pub status_code: String,
    pub is_anomaly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_category: Option<String>,
}

/// Everything the dashboard renders for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub total_records: usize,
    pub total_anomalies: usize,
    pub anomaly_rate: f64,
    pub anomalies_by_severity: BTreeMap<String, usize>,
    pub anomalies_by_category: BTreeMap<String, usize>,
    pub anomalies_by_detection_method: BTreeMap<String, usize>,
    /// Top source addresses among anomalies.
    pub top_source_ips: Vec<CountEntry>,
    /// Top domains among anomalies.
    pub top_domains: Vec<CountEntry>,
    /// Top HTTP methods among anomalies.
    pub top_methods: Vec<CountEntry>,
    /// Top status codes among anomalies.
    pub top_status_codes: Vec<CountEntry>,
    pub actions: ActionCounts,
    pub daily_counts: Vec<DailyCount>,
    pub recent_anomalies: Vec<RecentAnomaly>,
    pub timeline: Vec<TimelinePoint>,
}

/// Build the dashboard for one analysis run.
pub fn build_dashboard(records: &[LogRecord], verdicts: &[AnomalyVerdict]) -> DashboardData {
    let total_records = records.len();
    let total_anomalies = verdicts.len();
    let anomaly_rate = if total_records > 0 {
        total_anomalies as f64 / total_records as f64
    } else {
        0.0
    };

    let mut by_severity = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    let mut by_method = BTreeMap::new();
    for v in verdicts {
        *by_severity.entry(v.severity.as_str().to_string()).or_insert(0) += 1;
        *by_category.entry(v.threat_category.clone()).or_insert(0) += 1;
        for method in &v.summary.detection_methods {
            *by_method.entry(method.clone()).or_insert(0) += 1;
        }
    }

    let mut actions = ActionCounts::default();
    for r in records {
        match r.action {
            Action::Allowed => actions.allowed += 1,
            Action::Blocked => actions.blocked += 1,
            Action::Other => actions.other += 1,
        }
    }

    // Per-day roll-up, ascending by date.
    let mut daily: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for r in records {
        daily.entry(r.timestamp.format("%Y-%m-%d").to_string()).or_default().0 += 1;
    }
    for v in verdicts {
        daily
            .entry(v.record.timestamp.format("%Y-%m-%d").to_string())
            .or_default()
            .1 += 1;
    }
    let daily_counts = daily
        .into_iter()
        .map(|(date, (records, anomalies))| DailyCount {
            date,
            records,
            anomalies,
        })
        .collect();

    // Recent anomalies: newest first, capped.
    let mut recent: Vec<&AnomalyVerdict> = verdicts.iter().collect();
    recent.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
    let recent_anomalies = recent
        .iter()
        .take(RECENT_N)
        .map(|v| RecentAnomaly {
            timestamp: v.record.timestamp,
            src_ip: v.record.src_ip.clone(),
            domain: v.record.domain.clone(),
            severity: v.severity.as_str().to_string(),
            confidence: v.confidence,
            threat_category: v.threat_category.clone(),
            explanation: v
                .reasons
                .first()
                .cloned()
                .unwrap_or_else(|| NO_EXPLANATION.to_string()),
        })
        .collect();

    // Full timeline: every record oldest-first, tagged with its verdict when
    // it has one. Stable sort keeps batch order for equal timestamps.
    let by_id: HashMap<Uuid, &AnomalyVerdict> =
        verdicts.iter().map(|v| (v.record.id, v)).collect();
    let mut timeline: Vec<TimelinePoint> = records
        .iter()
        .map(|r| {
            let verdict = by_id.get(&r.id);
            TimelinePoint {
                record_id: r.id,
                timestamp: r.timestamp,
                bytes_sent: r.bytes_sent(),
                src_ip: r.src_ip.clone(),
                domain: r.domain.clone(),
                status_code: r.status_code.clone(),
                is_anomaly: verdict.is_some(),
                anomaly_type: verdict.map(|v| anomaly_type(v)),
                threat_category: verdict.map(|v| v.threat_category.clone()),
            }
        })
        .collect();
    timeline.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    DashboardData {
        total_records,
        total_anomalies,
        anomaly_rate,
        anomalies_by_severity: by_severity,
        anomalies_by_category: by_category,
        anomalies_by_detection_method: by_method,
        top_source_ips: top_n(verdicts.iter().map(|v| v.record.src_ip.as_str())),
        top_domains: top_n(verdicts.iter().map(|v| v.record.domain.as_str())),
        top_methods: top_n(verdicts.iter().map(|v| v.record.method.as_str())),
        top_status_codes: top_n(verdicts.iter().map(|v| v.record.status_code.as_str())),
        actions,
        daily_counts,
        recent_anomalies,
        timeline,
    }
}

/// Dominant detection label for a verdict: the first rule finding's type, or
/// which statistical model(s) flagged it.
fn anomaly_type(verdict: &AnomalyVerdict) -> String {
    if let Some(first) = verdict.findings.first() {
        first.kind.as_str().to_string()
    } else if verdict.flagged_by_isolation && verdict.flagged_by_lof {
        "ml".to_string()
    } else if verdict.flagged_by_isolation {
        "isolation_forest".to_string()
    } else if verdict.flagged_by_lof {
        "lof".to_string()
    } else {
        "other".to_string()
    }
}

/// Top keys by count, descending, ties broken by key so output is stable.
fn top_n<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry {
            key: key.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.key.cmp(&b.key)));
    entries.truncate(TOP_N);
    entries
}

// ============================================================================
// TESTS
// ============================================================================
