//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection pool and provides access to all repositories.

use std::path::Path;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::business::DieselBusinessRepository;
use super::evidence::DieselEvidenceRepository;
use super::pool::{DbPool, DieselError};
use super::validation::DieselValidationRepository;
use crate::schema::storage_meta;
use crate::with_conn;

/// Database context that manages the connection pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:leads.db")?;
/// ctx.init_schema().await?;
/// let review = ctx.businesses().list_by_status(BusinessStatus::ReviewRequired, None).await?;
/// ```
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:` URLs or file paths).
    pub fn from_url(url: &str) -> Result<Self, DieselError> {
        Ok(Self {
            pool: DbPool::from_url(url)?,
        })
    }

    /// Get a business repository.
    pub fn businesses(&self) -> DieselBusinessRepository {
        DieselBusinessRepository::new(self.pool.clone())
    }

    /// Get the evidence ledger.
    pub fn evidence(&self) -> DieselEvidenceRepository {
        DieselEvidenceRepository::new(self.pool.clone())
    }

    /// Get a validation repository.
    pub fn validations(&self) -> DieselValidationRepository {
        DieselValidationRepository::new(self.pool.clone())
    }

    /// Apply pending schema migrations.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        super::migrations::run_migrations(self.pool.database_url()).await?;
        Ok(())
    }

    /// Storage format version recorded by the initial migration.
    pub async fn get_schema_version(&self) -> Result<Option<String>, DieselError> {
        with_conn!(self.pool, conn, {
            storage_meta::table
                .filter(storage_meta::key.eq("format_version"))
                .select(storage_meta::value)
                .first::<String>(&mut conn)
                .await
                .optional()
        })
    }

    /// List user tables.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        with_conn!(self.pool, conn, {
            let rows: Vec<TableName> = diesel::sql_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .load(&mut conn)
            .await?;
            Ok(rows.into_iter().map(|r| r.name).collect())
        })
    }
}

#[derive(diesel::QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}

#[cfg(test)]
mod tests {
    use crate::repository::test_context;

    #[tokio::test]
    async fn test_init_schema_creates_tables() {
        let (ctx, _dir) = test_context().await;

        let tables = ctx.list_tables().await.unwrap();
        for expected in [
            "businesses",
            "exclusions",
            "exports",
            "observations",
            "storage_meta",
            "validations",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }

        assert_eq!(
            ctx.get_schema_version().await.unwrap().as_deref(),
            Some("1")
        );
    }
}
