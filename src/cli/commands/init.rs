//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::util::redact_url_password;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    let version = ctx.get_schema_version().await?.unwrap_or_else(|| "unknown".into());
    println!(
        "{} Initialized leadgate in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!(
        "  Database: {} (schema {})",
        redact_url_password(&settings.database_url()),
        version
    );

    Ok(())
}
