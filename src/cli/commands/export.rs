//! Export command.

use std::path::Path;

use console::style;

use super::helpers::build_orchestrator;
use crate::config::{Config, Settings};
use crate::models::BusinessStatus;

pub async fn cmd_export(
    settings: &Settings,
    config: &Config,
    file: &Path,
    statuses: &[BusinessStatus],
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(settings, config, true).await?;
    let report = orchestrator.export(file, statuses).await?;

    if report.exported == 0 {
        println!(
            "{} No businesses to export; wrote an empty list to {}",
            style("!").yellow(),
            report.file.display()
        );
    } else {
        println!(
            "{} Exported {} business(es) to {}",
            style("✓").green(),
            report.exported,
            report.file.display()
        );
    }
    Ok(())
}
