//! Qualify command.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::helpers::build_orchestrator;
use crate::config::{Config, Settings};
use crate::pipeline::RunOptions;

/// Run pending businesses through the gates.
pub async fn cmd_qualify(
    settings: &Settings,
    config: &Config,
    requalify: bool,
    limit: usize,
    offline: bool,
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(settings, config, offline).await?;
    let options = RunOptions {
        requalify,
        limit: (limit > 0).then_some(limit),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Running qualification gates...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = orchestrator.run_batch(options).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            return Err(e.into());
        }
    };

    println!(
        "{} {} qualified, {} excluded, {} for review",
        style("✓").green(),
        style(report.qualified).green(),
        style(report.excluded).red(),
        style(report.review_required).yellow()
    );
    if report.skipped > 0 {
        println!("  {} skipped (overridden or already final)", report.skipped);
    }
    Ok(())
}
