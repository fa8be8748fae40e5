//! Shared helper functions for CLI commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::config::{Config, Settings};
use crate::lookup::{StaticGeocoder, WaybackAgeLookup};
use crate::pipeline::Orchestrator;
use crate::repository::DbContext;

/// Open the database, applying pending migrations.
pub async fn open_context(settings: &Settings) -> anyhow::Result<DbContext> {
    if !settings.database_exists() {
        anyhow::bail!(
            "No database at {}. Run 'leadgate init' first.",
            settings.database_path().display()
        );
    }
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    Ok(ctx)
}

/// Orchestrator with the offline geocoder and, unless `offline`, the Wayback lookup.
pub async fn build_orchestrator(
    settings: &Settings,
    config: &Config,
    offline: bool,
) -> anyhow::Result<Orchestrator> {
    let ctx = open_context(settings).await?;
    let mut orchestrator = Orchestrator::new(ctx, config.qualification.clone())?
        .with_geocoder(Arc::new(StaticGeocoder::default()));

    if !offline {
        let lookup = WaybackAgeLookup::new(
            &settings.user_agent,
            Duration::from_secs(settings.request_timeout),
        )?;
        orchestrator = orchestrator.with_website_age(Arc::new(lookup));
    }
    Ok(orchestrator)
}

/// Read a JSON array or JSON Lines file.
pub async fn read_json_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_json_records(&text).with_context(|| format!("Invalid records in {}", path.display()))
}

fn parse_json_records<T: DeserializeOwned>(text: &str) -> anyhow::Result<Vec<T>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}
