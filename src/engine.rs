//! Analysis Engine - Orchestration
//!
//! Runs the full pipeline over one batch: rule heuristics and statistical
//! models in parallel, then per-record fusion, aggregation, and the optional
//! narrative stage. The async path offloads both CPU-bound stages to
//! blocking tasks; the sync path exists for embedding and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchContext, ByteStats};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::features::{batch_matrix, FEATURE_LAYOUT};
use crate::fusion::{self, AnomalyVerdict, FusionInput};
use crate::narrative::{NarrativeClient, NarrativeContext, NarrativeReport};
use crate::reasoning;
use crate::record::LogRecord;
use crate::report::{build_dashboard, DashboardData};
use crate::rules::{self, SecurityFinding};
use crate::stats::OutlierReport;

/// How each signal source contributed to the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub isolation_flagged: usize,
    pub lof_flagged: usize,
    /// Records flagged by both statistical models.
    pub model_agreement: usize,
    pub rule_findings: usize,
}

/// The complete result of analyzing one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub num_records: usize,
    pub num_anomalies: usize,
    pub verdicts: Vec<AnomalyVerdict>,
    pub findings: Vec<SecurityFinding>,
    pub model_performance: ModelPerformance,
    pub dashboard: DashboardData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeReport>,
}

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a batch synchronously. The narrative stage is skipped; use
    /// [`analyze_async`](Self::analyze_async) for the full pipeline.
    pub fn analyze(&self, records: &[LogRecord]) -> Result<AnalysisReport, EngineError> {
        if records.is_empty() {
            return Err(EngineError::EmptyBatch);
        }
        let ctx = BatchContext::new(records, &self.config.policy);
        let findings = rules::run_all(&ctx);
        let matrix = batch_matrix(records);
        let outlier_report = self.config.outlier_engine().run(records, &matrix);
        Ok(self.fuse_results(records, findings, outlier_report))
    }

    /// Analyze a batch with both signal sources running on blocking tasks,
    /// then attempt the narrative stage if enabled and configured.
    pub async fn analyze_async(
        &self,
        records: Arc<Vec<LogRecord>>,
    ) -> Result<AnalysisReport, EngineError> {
        if records.is_empty() {
            return Err(EngineError::EmptyBatch);
        }

        let rule_records = Arc::clone(&records);
        let policy = self.config.policy.clone();
        let rules_task = tokio::task::spawn_blocking(move || {
            let ctx = BatchContext::new(&rule_records, &policy);
            rules::run_all(&ctx)
        });

        let stat_records = Arc::clone(&records);
        let outlier = self.config.outlier_engine();
        let stats_task = tokio::task::spawn_blocking(move || {
            let matrix = batch_matrix(&stat_records);
            outlier.run(&stat_records, &matrix)
        });

        let findings = rules_task
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;
        let outlier_report = stats_task
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;

        let mut report = self.fuse_results(&records, findings, outlier_report);

        if self.config.narrative_enabled {
            match NarrativeClient::from_env() {
                Some(client) => {
                    report.narrative = client.generate(&narrative_context(&report)).await;
                }
                None => log::debug!("narrative stage skipped: no API key configured"),
            }
        }

        Ok(report)
    }

    /// Like [`analyze_async`](Self::analyze_async) but aborts the whole run
    /// when it exceeds `timeout`. No partial results survive a timeout.
    pub async fn analyze_with_timeout(
        &self,
        records: Arc<Vec<LogRecord>>,
        timeout: Duration,
    ) -> Result<AnalysisReport, EngineError> {
        match tokio::time::timeout(timeout, self.analyze_async(records)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("analysis aborted after {timeout:?}");
                Err(EngineError::Timeout(timeout))
            }
        }
    }

    /// Fuse per-record signals into verdicts and assemble the report.
    fn fuse_results(
        &self,
        records: &[LogRecord],
        findings: Vec<SecurityFinding>,
        outlier_report: OutlierReport,
    ) -> AnalysisReport {
        let byte_stats = ByteStats::compute(records);

        // Group findings per record, preserving detector order within each.
        let mut by_record: HashMap<usize, Vec<SecurityFinding>> = HashMap::new();
        for finding in &findings {
            by_record
                .entry(finding.record_index)
                .or_default()
                .push(finding.clone());
        }

        let iso_importance = layout_importance(&outlier_report.isolation_importance);
        let lof_importance = layout_importance(&outlier_report.lof_importance);

        let mut performance = ModelPerformance {
            rule_findings: findings.len(),
            ..Default::default()
        };

        let mut verdicts = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let flag = &outlier_report.flags[index];
            if flag.isolation {
                performance.isolation_flagged += 1;
            }
            if flag.lof {
                performance.lof_flagged += 1;
            }
            if flag.isolation && flag.lof {
                performance.model_agreement += 1;
            }

            let record_findings = by_record.remove(&index).unwrap_or_default();
            let reasons =
                reasoning::record_reasons(record, &byte_stats, &record_findings, flag);
            let input = FusionInput {
                record,
                findings: record_findings,
                flagged_by_isolation: flag.isolation,
                flagged_by_lof: flag.lof,
                reasons,
                isolation_reasons: reasoning::isolation_reasons(flag),
                lof_reasons: reasoning::lof_reasons(flag),
                isolation_importance: iso_importance.clone(),
                lof_importance: lof_importance.clone(),
            };
            if let Some(verdict) = fusion::fuse(input, &self.config.policy) {
                verdicts.push(verdict);
            }
        }

        log::info!(
            "analyzed {} records: {} anomalies, {} rule findings",
            records.len(),
            verdicts.len(),
            findings.len()
        );

        let dashboard = build_dashboard(records, &verdicts);
        AnalysisReport {
            num_records: records.len(),
            num_anomalies: verdicts.len(),
            verdicts,
            findings,
            model_performance: performance,
            dashboard,
            narrative: None,
        }
    }
}

/// Importance weights back in feature-layout order, for per-verdict
/// attribution.
fn layout_importance(ranked: &[(String, f64)]) -> Vec<f64> {
    FEATURE_LAYOUT
        .iter()
        .map(|name| {
            ranked
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, w)| *w)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Condense a report into the prompt context for the narrative stage.
fn narrative_context(report: &AnalysisReport) -> NarrativeContext {
    let mut top_categories: Vec<(String, usize)> = report
        .dashboard
        .anomalies_by_category
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    top_categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_categories.truncate(3);

    let highest_severity = report
        .verdicts
        .iter()
        .map(|v| v.severity)
        .max()
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "none".to_string());

    let sample_reasons = report
        .verdicts
        .iter()
        .filter_map(|v| v.reasons.first().cloned())
        .take(5)
        .collect();

    NarrativeContext {
        total_records: report.num_records,
        total_anomalies: report.num_anomalies,
        top_categories,
        highest_severity,
        sample_reasons,
    }
}

// ============================================================================
// TESTS
// ============================================================================
