//! Ingest and enrich commands.

use std::path::Path;

use console::style;

use super::helpers::{build_orchestrator, read_json_records};
use crate::config::{Config, Settings};
use crate::models::{DiscoveryRecord, EnrichmentSignal};

/// Ingest discovery records from a file.
pub async fn cmd_ingest(settings: &Settings, config: &Config, file: &Path) -> anyhow::Result<()> {
    let records: Vec<DiscoveryRecord> = read_json_records(file).await?;
    println!(
        "{} Ingesting {} record(s) from {}",
        style("→").cyan(),
        records.len(),
        file.display()
    );

    let orchestrator = build_orchestrator(settings, config, true).await?;
    let report = orchestrator.ingest_batch(&records).await?;

    println!(
        "{} {} new, {} merged",
        style("✓").green(),
        report.created,
        report.merged
    );
    if report.skipped > 0 {
        println!(
            "{} {} record(s) skipped for missing identity fields (run with -v for details)",
            style("!").yellow(),
            report.skipped
        );
    }
    Ok(())
}

/// Append enrichment signals from a file.
pub async fn cmd_enrich(settings: &Settings, config: &Config, file: &Path) -> anyhow::Result<()> {
    let signals: Vec<EnrichmentSignal> = read_json_records(file).await?;

    let orchestrator = build_orchestrator(settings, config, true).await?;
    let report = orchestrator.enrich_batch(&signals).await?;

    println!(
        "{} Recorded {} observation(s)",
        style("✓").green(),
        report.recorded
    );
    if report.unmatched > 0 {
        println!(
            "{} {} signal(s) matched no business",
            style("!").yellow(),
            report.unmatched
        );
    }
    if report.rejected > 0 {
        println!(
            "{} {} signal(s) rejected for confidence outside [0, 1]",
            style("!").yellow(),
            report.rejected
        );
    }
    Ok(())
}
