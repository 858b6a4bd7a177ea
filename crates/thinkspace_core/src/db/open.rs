//! Opening the notes database.
//!
//! # Responsibility
//! - Open the store file (or an in-memory store for tests).
//! - Apply connection settings and migrations before handing it out.
//!
//! # Invariants
//! - A returned connection waits up to `BUSY_TIMEOUT` on a locked file.
//! - A returned connection is at `migrations::latest_version()`.
//! - A returned connection has the `casefold` SQL function registered.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::search::fallback::register_casefold;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) the store at `path`.
///
/// Missing parent directories are created first. Emits `db_open` events
/// with the elapsed time and outcome.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with("file", || {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Connection::open(path)?)
    })
}

/// Opens a private in-memory store with the full schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", || Ok(Connection::open_in_memory()?))
}

fn open_with<F>(mode: &str, connect: F) -> DbResult<Connection>
where
    F: FnOnce() -> DbResult<Connection>,
{
    let started_at = Instant::now();
    let result = connect().and_then(|mut conn| {
        prepare(&mut conn)?;
        Ok(conn)
    });

    let elapsed_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={elapsed_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={elapsed_ms} error_code={} error={err}",
            error_code(err)
        ),
    }
    result
}

fn prepare(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    register_casefold(conn)?;
    apply_migrations(conn)
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Io(_) => "db_dir_failed",
        DbError::Sqlite(_) => "db_open_failed",
        DbError::UnsupportedSchemaVersion { .. } => "db_schema_too_new",
    }
}
