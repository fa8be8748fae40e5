//! Qualification orchestrator.
//!
//! Drives businesses through the state machine: ingest, locate, enrich,
//! run the gates and persist the final status with its audit trail.
//! Infrastructure failures stop a batch and report the stage that failed;
//! missing or conflicting business data never does.

mod estimate;
mod export;
mod orchestrator;

use std::path::PathBuf;

pub use estimate::{derive_benchmark_estimate, BENCHMARK_ESTIMATE_SOURCE};
pub use export::{ExportEntry, ExportReport};
pub use orchestrator::Orchestrator;

use crate::config::ConfigError;
use crate::models::BusinessStatus;
use crate::repository::{FinalizeOutcome, StoreError};

/// Pipeline stage, reported when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Enrich,
    Geocode,
    Qualify,
    Expire,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Enrich => "enrich",
            Self::Geocode => "geocode",
            Self::Qualify => "qualify",
            Self::Expire => "expire",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that stop a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid category pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{stage} stage failed after {processed} business(es) processed: {source}")]
    Stage {
        stage: Stage,
        processed: usize,
        #[source]
        source: StoreError,
    },

    #[error("only qualified or excluded businesses can be exported, not {0}")]
    NotExportable(BusinessStatus),

    #[error("failed to write export file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stage that failed, for infrastructure failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    fn with_processed(self, processed: usize) -> Self {
        match self {
            Self::Stage { stage, source, .. } => Self::Stage {
                stage,
                processed,
                source,
            },
            other => other,
        }
    }
}

/// Attach a stage to repository errors.
pub(crate) trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E: Into<StoreError>> StageExt<T> for Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::Stage {
            stage,
            processed: 0,
            source: e.into(),
        })
    }
}

/// Why a business was left alone by a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    ManualOverride,
    AlreadyFinal(BusinessStatus),
    Exported,
    /// No contact or category observation, so the business never reached ENRICHED.
    NoEvidence,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManualOverride => f.write_str("manually overridden"),
            Self::AlreadyFinal(status) => write!(f, "already {}", status),
            Self::Exported => f.write_str("already exported"),
            Self::NoEvidence => f.write_str("no contact or category evidence"),
        }
    }
}

/// Result of processing one business.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Finalized(FinalizeOutcome),
    Skipped(SkipReason),
}

impl ProcessOutcome {
    pub fn status(&self) -> Option<BusinessStatus> {
        match self {
            Self::Finalized(outcome) => Some(outcome.status),
            Self::Skipped(_) => None,
        }
    }
}

/// Counters for an ingest batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    pub created: usize,
    pub merged: usize,
    /// Records without enough identity to fingerprint.
    pub skipped: usize,
}

/// Counters for an enrichment batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrichReport {
    pub recorded: usize,
    /// Signals whose target business does not exist.
    pub unmatched: usize,
    /// Signals with confidence outside [0, 1].
    pub rejected: usize,
}

/// Options for a qualification run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    /// Re-run the gates for QUALIFIED and EXCLUDED businesses.
    pub requalify: bool,
    pub limit: Option<usize>,
}

/// Counters for a qualification run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    pub qualified: usize,
    pub excluded: usize,
    pub review_required: usize,
    pub skipped: usize,
}

impl RunReport {
    /// Businesses that received a final status in this run.
    pub fn finalized(&self) -> usize {
        self.qualified + self.excluded + self.review_required
    }

    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome.status() {
            Some(BusinessStatus::Qualified) => self.qualified += 1,
            Some(BusinessStatus::Excluded) => self.excluded += 1,
            Some(BusinessStatus::ReviewRequired) => self.review_required += 1,
            _ => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitionError;

    #[test]
    fn run_report_counts_by_status() {
        let mut report = RunReport::default();
        for status in [
            BusinessStatus::Qualified,
            BusinessStatus::Excluded,
            BusinessStatus::Excluded,
            BusinessStatus::ReviewRequired,
        ] {
            report.record(&ProcessOutcome::Finalized(FinalizeOutcome {
                status,
                validation_version: 1,
                excluded_by: Vec::new(),
            }));
        }
        report.record(&ProcessOutcome::Skipped(SkipReason::ManualOverride));

        assert_eq!(report.excluded, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.finalized(), 4);
    }

    #[test]
    fn stage_error_reports_progress() {
        let result: Result<(), StoreError> =
            Err(TransitionError::NotFound("b1".into()).into());
        let err = result.stage(Stage::Qualify).unwrap_err().with_processed(7);

        assert_eq!(err.stage(), Some(Stage::Qualify));
        let message = err.to_string();
        assert!(message.starts_with("qualify stage failed after 7 business(es)"));
        assert!(message.contains("b1"));
    }
}
