//! LogLens Core - Anomaly Detection & Confidence Fusion Engine
//!
//! Analyzes batches of parsed access-log records with two independent signal
//! sources - a bank of security rule heuristics and a pair of unsupervised
//! statistical models - then fuses both into per-record verdicts with
//! calibrated confidence, plain-language reasoning, and dashboard roll-ups.
//!
//! The pipeline is deterministic end to end: given the same batch and the
//! same [`config::EngineConfig`], two runs produce identical reports. The
//! optional narrative stage is the only non-deterministic piece and is
//! strictly best-effort.

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod fusion;
pub mod narrative;
pub mod reasoning;
pub mod record;
pub mod report;
pub mod rules;
pub mod stats;

pub use config::EngineConfig;
pub use engine::{AnalysisEngine, AnalysisReport, ModelPerformance};
pub use error::EngineError;
pub use fusion::{AnomalyVerdict, ConfidencePolicy};
pub use record::{Action, LogRecord};
pub use report::DashboardData;
pub use rules::{FindingKind, SecurityFinding, Severity};
