//! Settings discovery: `--config`, a file next to the data dir, then prefer.

use std::path::{Path, PathBuf};

use super::settings::DEFAULT_DATABASE_FILENAME;
use super::{Config, ConfigError, Settings};

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (--data flag).
    pub data: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_db_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
        || path.is_file()
}

/// Split a `--data` argument into (data dir, database filename).
fn resolve_data_path(path: &Path) -> (PathBuf, String) {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir().join(path)
    };

    if is_db_file(&path) {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_DATABASE_FILENAME)
            .to_string();
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        (dir, filename)
    } else {
        (path, DEFAULT_DATABASE_FILENAME.to_string())
    }
}

/// Look for leadgate.{ext} or config.{ext} inside the data directory.
fn find_config_next_to_db(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = ["leadgate", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

async fn load_file_config(
    options: &LoadOptions,
    data_dir_override: Option<&PathBuf>,
) -> Result<Config, ConfigError> {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path).await;
    }

    // Priority 2: Config next to data dir
    if let Some(data_dir) = data_dir_override {
        if let Some(config_path) = find_config_next_to_db(data_dir) {
            tracing::debug!("Found config next to data dir: {}", config_path.display());
            return Config::load_from_path(&config_path).await;
        }
    }

    // Priority 3: Auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
///
/// The qualification sections are validated here, so a bad threshold stops
/// the process before any business is touched.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let resolved_data = options.data.as_ref().map(|d| resolve_data_path(d));
    let config = load_file_config(&options, resolved_data.as_ref().map(|(dir, _)| dir)).await?;
    config.qualification.validate()?;

    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };
    config.apply_to_settings(&mut settings, &base_dir);

    // --data takes precedence over the config file
    if let Some((data_dir, filename)) = resolved_data {
        settings.data_dir = data_dir;
        settings.database_filename = filename;
    }

    // DATABASE_URL environment variable takes highest precedence
    if let Some(database_url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!(
            "Using DATABASE_URL from environment: {}",
            crate::repository::util::redact_url_password(&database_url)
        );
        settings.database_url = Some(database_url);
    }

    tracing::debug!(
        config_hash = %config.hash(),
        "Settings resolved: data_dir={}",
        settings.data_dir.display()
    );

    Ok((settings, config))
}
