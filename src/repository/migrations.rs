//! Applies the cetane migrations in `crate::migrations` to a SQLite file.
//!
//! cetane and rusqlite are synchronous, so every entry point hops onto a
//! blocking task and reports failures as diesel errors like the rest of the
//! repository layer.

use cetane::backend::Sqlite;
use cetane::migrator::{MigrationStateStore, Migrator};
use rusqlite::Connection;
use tracing::{debug, info};

use super::pool::DieselError;
use super::util::{sqlite_path, to_diesel_error};

/// Bookkeeping table holding the names of applied migrations.
const STATE_TABLE: &str = "__cetane_migrations";

/// Run pending migrations for a database URL.
///
/// Returns the names of the migrations applied by this call.
pub async fn run_migrations(database_url: &str) -> Result<Vec<String>, DieselError> {
    let path = sqlite_path(database_url)?;
    blocking(move || {
        let conn = open(&path)?;
        migrate(&conn)
    })
    .await
}

/// Names of migrations recorded as applied, in name order.
pub async fn applied_migrations(database_url: &str) -> Result<Vec<String>, DieselError> {
    let path = sqlite_path(database_url)?;
    blocking(move || {
        let conn = open(&path)?;
        LedgerState::attach(&conn)?
            .applied_migrations()
            .map_err(to_diesel_error)
    })
    .await
}

async fn blocking<T, F>(work: F) -> Result<T, DieselError>
where
    F: FnOnce() -> Result<T, DieselError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(to_diesel_error)?
}

fn open(path: &str) -> Result<Connection, DieselError> {
    let conn = Connection::open(path).map_err(to_diesel_error)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(to_diesel_error)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<Vec<String>, DieselError> {
    let registry = crate::migrations::registry();
    let state = LedgerState::attach(conn)?;

    let applied: Vec<String> = Migrator::new(&registry, &Sqlite, state)
        .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
        .map_err(to_diesel_error)?
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    if applied.is_empty() {
        debug!("Ledger schema is up to date");
    }
    for name in &applied {
        info!(migration = %name, "Applied migration");
    }
    Ok(applied)
}

/// cetane state store backed by [`STATE_TABLE`].
struct LedgerState<'a> {
    conn: &'a Connection,
}

impl<'a> LedgerState<'a> {
    /// Create the bookkeeping table if needed and wrap the connection.
    fn attach(conn: &'a Connection) -> Result<Self, DieselError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {STATE_TABLE} (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"
        ))
        .map_err(to_diesel_error)?;
        Ok(Self { conn })
    }

    fn execute(&self, sql: &str, name: &str) -> Result<(), String> {
        self.conn
            .execute(sql, [name])
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

impl MigrationStateStore for LedgerState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let sql = format!("SELECT name FROM {STATE_TABLE} ORDER BY name");
        let mut stmt = self.conn.prepare(&sql).map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.execute(
            &format!("INSERT OR IGNORE INTO {STATE_TABLE} (name) VALUES (?1)"),
            name,
        )
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.execute(&format!("DELETE FROM {STATE_TABLE} WHERE name = ?1"), name)
    }
}
