//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite. Schema changes are cetane
//! migrations (`crate::migrations`), applied by [`migrations::run_migrations`].

pub mod business;
pub mod context;
pub mod evidence;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod util;
pub mod validation;

pub use business::{DieselBusinessRepository, IngestOutcome};
pub use context::DbContext;
pub use evidence::DieselEvidenceRepository;
pub use pool::{DbPool, DieselError};
pub use validation::{DieselValidationRepository, FinalizeOutcome};

use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{ParseEnumError, TransitionError};

/// Errors from repository operations that enforce domain rules.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("failed to publish export file: {0}")]
    Publish(#[source] std::io::Error),
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an enum column, falling back to `fallback` with a warning when the
/// stored name is unknown to this build.
pub(crate) fn parse_column<T>(raw: &str, fallback: T) -> T
where
    T: FromStr<Err = ParseEnumError> + std::fmt::Debug,
{
    raw.parse().unwrap_or_else(|e| {
        warn!("{}; reading it as {:?}", e, fallback);
        fallback
    })
}

/// Decode a JSON id list column.
pub(crate) fn parse_id_list(s: &str) -> Vec<i64> {
    serde_json::from_str(s).unwrap_or_default()
}

/// Encode an id list for storage.
pub(crate) fn format_id_list(ids: &[i64]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Fresh migrated database in a temporary directory.
#[cfg(test)]
pub(crate) async fn test_context() -> (DbContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("test.db"));
    ctx.init_schema().await.unwrap();
    (ctx, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::{BusinessStatus, GateAction};

    #[test]
    fn test_parse_datetime_fallback() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
        assert_eq!(
            parse_datetime("2024-03-01T10:00:00Z").to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_column_known_and_unknown() {
        assert_eq!(parse_column("AUTO_EXCLUDE", GateAction::ReviewRequired), GateAction::AutoExclude);
        assert_eq!(parse_column("HOLD", GateAction::ReviewRequired), GateAction::ReviewRequired);
        assert_eq!(
            parse_column("review_required", BusinessStatus::Discovered),
            BusinessStatus::ReviewRequired
        );
        assert_eq!(parse_column("archived", BusinessStatus::Discovered), BusinessStatus::Discovered);
    }

    #[test]
    fn test_id_list_column() {
        assert_eq!(format_id_list(&[3, 7]), "[3,7]");
        assert_eq!(parse_id_list("[3,7]"), vec![3, 7]);
        assert!(parse_id_list("garbage").is_empty());
    }
}
