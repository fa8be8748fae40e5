//! Runtime settings resolved from config, flags and environment.

use std::fs;
use std::path::PathBuf;

use crate::repository::{DbContext, DieselError};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "leadgate.db";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    /// Set via DATABASE_URL env var.
    pub database_url: Option<String>,
    /// User agent for HTTP lookups.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // Data dir -> Home dir -> Current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("leadgate");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            user_agent: format!("leadgate/{} (lead qualification)", env!("CARGO_PKG_VERSION")),
            request_timeout: 30,
        }
    }
}

impl Settings {
    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        if self.database_url.is_some() {
            true
        } else {
            self.database_path().exists()
        }
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> Result<DbContext, DieselError> {
        DbContext::from_url(&self.database_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_dir(data_dir: PathBuf) -> Settings {
        Settings {
            data_dir,
            ..Settings::default()
        }
    }

    #[test]
    fn test_database_url_from_data_dir() {
        let settings = in_dir(PathBuf::from("/tmp/leads"));
        assert_eq!(settings.database_url(), "sqlite:/tmp/leads/leadgate.db");
        assert!(settings.create_db_context().is_ok());
    }

    #[test]
    fn test_explicit_url_wins() {
        let settings = Settings {
            database_url: Some("sqlite:/srv/other.db".into()),
            ..in_dir(PathBuf::from("/tmp/leads"))
        };
        assert_eq!(settings.database_url(), "sqlite:/srv/other.db");
        assert!(settings.database_exists());
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempfile::tempdir().unwrap();
        let settings = in_dir(dir.path().join("nested/data"));
        settings.ensure_directories().unwrap();
        assert!(settings.data_dir.is_dir());
        assert!(!settings.database_exists());
    }
}
