//! JSON export of finalized businesses with their audit trail.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use super::{Orchestrator, PipelineError, Stage, StageExt};
use crate::models::{Business, BusinessStatus, Exclusion, Validation};

/// One exported business: the record, its latest gate results and every exclusion.
#[derive(Debug, Serialize)]
pub struct ExportEntry {
    pub business: Business,
    pub validations: Vec<Validation>,
    pub exclusions: Vec<Exclusion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file: PathBuf,
    pub exported: usize,
}

impl Orchestrator {
    /// Write businesses in `statuses` to `path` as pretty JSON and mark each
    /// one EXPORTED with a link to the file.
    ///
    /// The file appears only if every business was marked; a failed export
    /// leaves neither a file nor EXPORTED rows behind.
    ///
    /// Only QUALIFIED and EXCLUDED may be exported; REVIEW_REQUIRED needs a
    /// decision first.
    pub async fn export(
        &self,
        path: &Path,
        statuses: &[BusinessStatus],
    ) -> Result<ExportReport, PipelineError> {
        if let Some(status) = statuses
            .iter()
            .find(|s| !matches!(s, BusinessStatus::Qualified | BusinessStatus::Excluded))
        {
            return Err(PipelineError::NotExportable(*status));
        }

        let ctx = self.context();
        let selected = ctx
            .businesses()
            .list_by_statuses(statuses, None)
            .await
            .stage(Stage::Export)?;

        let validations = ctx.validations();
        let mut entries = Vec::with_capacity(selected.len());
        for business in selected {
            let latest = validations
                .validations(&business.id, None)
                .await
                .stage(Stage::Export)?;
            let exclusions = validations
                .exclusions(&business.id)
                .await
                .stage(Stage::Export)?;
            entries.push(ExportEntry {
                business,
                validations: latest,
                exclusions,
            });
        }

        let json = serde_json::to_vec_pretty(&entries)?;
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        let io_error = |source: std::io::Error| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PipelineError::Io {
                path: dir.clone(),
                source,
            })?;

        // Staged beside the target so the final rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&dir).map_err(io_error)?;
        staged.write_all(&json).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;

        let export_file = path.display().to_string();
        let ids: Vec<String> = entries.iter().map(|e| e.business.id.clone()).collect();
        let target = path.to_path_buf();
        ctx.businesses()
            .mark_exported(&ids, &export_file, move || {
                staged.persist(&target).map(|_| ()).map_err(|e| e.error)
            })
            .await
            .stage(Stage::Export)?;

        info!("Exported {} business(es) to {}", entries.len(), export_file);
        Ok(ExportReport {
            file: path.to_path_buf(),
            exported: entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualificationConfig;
    use crate::models::DiscoveryRecord;
    use crate::pipeline::RunOptions;
    use crate::repository::{test_context, StoreError};

    #[tokio::test]
    async fn test_export_marks_businesses_exported() {
        let (ctx, dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default()).unwrap();

        let record = DiscoveryRecord {
            place_types: vec!["gas_station".into()],
            ..DiscoveryRecord::new("Centennial Gas Bar", "https://maps.test/gas")
        };
        let business = orch.ingest(&record).await.unwrap().unwrap().business;
        orch.run_batch(RunOptions::default()).await.unwrap();

        let path = dir.path().join("out").join("excluded.json");
        let report = orch.export(&path, &[BusinessStatus::Excluded]).await.unwrap();
        assert_eq!(report.exported, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries = written.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["business"]["id"], business.id.as_str());
        assert!(!entries[0]["exclusions"].as_array().unwrap().is_empty());

        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Exported);
        let links = ctx.businesses().exports_for(&business.id).await.unwrap();
        assert_eq!(links[0].export_file, path.display().to_string());

        // Exported businesses are not picked up again.
        let again = orch.export(&path, &[BusinessStatus::Excluded]).await.unwrap();
        assert_eq!(again.exported, 0);
    }

    #[tokio::test]
    async fn test_review_required_cannot_be_exported() {
        let (ctx, dir) = test_context().await;
        let orch = Orchestrator::new(ctx, QualificationConfig::default()).unwrap();
        let result = orch
            .export(&dir.path().join("x.json"), &[BusinessStatus::ReviewRequired])
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::NotExportable(BusinessStatus::ReviewRequired))
        ));
    }

    #[tokio::test]
    async fn test_failed_export_leaves_no_file_and_no_marks() {
        let (ctx, dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default()).unwrap();

        let record = DiscoveryRecord {
            place_types: vec!["gas_station".into()],
            ..DiscoveryRecord::new("Centennial Gas Bar", "https://maps.test/gas")
        };
        let business = orch.ingest(&record).await.unwrap().unwrap().business;
        orch.run_batch(RunOptions::default()).await.unwrap();

        // A directory already sits where the export file should go.
        let out = dir.path().join("out");
        let path = out.join("excluded.json");
        std::fs::create_dir_all(&path).unwrap();

        let result = orch.export(&path, &[BusinessStatus::Excluded]).await;
        assert!(matches!(
            result,
            Err(PipelineError::Stage {
                stage: Stage::Export,
                processed: 0,
                source: StoreError::Publish(_),
            })
        ));

        assert!(path.is_dir());
        let leftovers: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(leftovers.len(), 1);

        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Excluded);
        assert!(ctx.businesses().exports_for(&business.id).await.unwrap().is_empty());
    }
}
