//! SQLite connection pool.
//!
//! Lightweight: connections are opened on demand. Every connection enables
//! foreign keys (cascading deletes from `businesses`) and a busy timeout so
//! concurrent writers wait for the lock instead of failing.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::{sqlite_path, to_diesel_error};

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

/// Database pool handed to every repository.
#[derive(Clone, Debug)]
pub struct DbPool {
    database_url: String,
}

impl DbPool {
    /// Create a pool from a database URL or file path.
    ///
    /// Accepts plain paths and `sqlite:` URLs; server URLs are rejected.
    pub fn from_url(url: &str) -> Result<Self, DieselError> {
        Ok(Self {
            database_url: sqlite_path(url)?,
        })
    }

    /// Create a pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self {
            database_url: path.display().to_string(),
        }
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<SqliteConn, DieselError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    /// Get the database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Run a block with a fresh connection bound to `$conn`.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn, {
///     businesses::table.load::<BusinessRecord>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident, $body:block) => {{
        let mut $conn = $pool.get().await?;
        $body
    }};
}

#[allow(unused_imports)]
pub use with_conn;
