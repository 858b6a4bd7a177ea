//! FTS5 capability probe and index provisioning.
//!
//! # Responsibility
//! - Detect once whether the linked SQLite supports FTS5.
//! - Create the `notes_fts` external-content index and the triggers that
//!   mirror every `notes` write into it.
//! - Pick the backend for this process, falling back to substring search
//!   whenever the index cannot be used.
//!
//! # Invariants
//! - Index rows are written by triggers in the same statement as the notes
//!   row, so a read after a write always sees a consistent index.
//! - Missing triggers mean the index may be stale; provisioning then
//!   rebuilds it from `notes`.
//! - Provisioning failures never reach the caller; they downgrade search.

use super::backend::{BackendKind, SearchBackend};
use super::fallback::SubstringBackend;
use super::fts::FtsBackend;
use crate::config::SearchMode;
use crate::db::DbResult;
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

const SYNC_TRIGGERS: [&str; 3] = ["notes_ai", "notes_ad", "notes_au"];

const INDEX_TABLE_SQL: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    text,
    project,
    tags,
    content = 'notes',
    content_rowid = 'id',
    tokenize = 'unicode61'
);";

const SYNC_TRIGGERS_SQL: &str = "
CREATE TRIGGER IF NOT EXISTS notes_ai AFTER INSERT ON notes BEGIN
    INSERT INTO notes_fts (rowid, text, project, tags)
    VALUES (new.id, new.text, new.project, new.tags);
END;
CREATE TRIGGER IF NOT EXISTS notes_ad AFTER DELETE ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, text, project, tags)
    VALUES ('delete', old.id, old.text, old.project, old.tags);
END;
CREATE TRIGGER IF NOT EXISTS notes_au AFTER UPDATE ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, text, project, tags)
    VALUES ('delete', old.id, old.text, old.project, old.tags);
    INSERT INTO notes_fts (rowid, text, project, tags)
    VALUES (new.id, new.text, new.project, new.tags);
END;";

/// Engine capabilities resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCapability {
    pub fts5: bool,
}

impl SearchCapability {
    /// Probes the engine behind `conn`.
    pub fn probe(conn: &Connection) -> Self {
        let fts5 = probe_fts5(conn);
        info!("event=search_probe module=search status=ok fts5={fts5}");
        Self { fts5 }
    }
}

/// Returns whether FTS5 virtual tables can be created on this connection.
///
/// Uses a throwaway table in the `temp` schema; the database file is not
/// touched.
pub fn probe_fts5(conn: &Connection) -> bool {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS temp.thinkspace_fts_probe USING fts5(body);
         DROP TABLE IF EXISTS temp.thinkspace_fts_probe;",
    )
    .is_ok()
}

/// Creates the index and sync triggers if needed.
///
/// Returns `true` when the index was (re)built from the notes table.
pub fn provision_index(conn: &mut Connection) -> DbResult<bool> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(INDEX_TABLE_SQL)?;

    let rebuild = count_sync_triggers(&tx)? < SYNC_TRIGGERS.len();
    if rebuild {
        tx.execute_batch(SYNC_TRIGGERS_SQL)?;
        tx.execute_batch("INSERT INTO notes_fts (notes_fts) VALUES ('rebuild');")?;
    }
    tx.commit()?;
    Ok(rebuild)
}

/// Drops the sync triggers so writes work on an engine without FTS5.
///
/// The virtual table itself is left in place; it is rebuilt the next time
/// the index is provisioned.
pub fn detach_index(conn: &Connection) -> DbResult<()> {
    for trigger in SYNC_TRIGGERS {
        conn.execute_batch(&format!("DROP TRIGGER IF EXISTS {trigger};"))?;
    }
    Ok(())
}

fn count_sync_triggers(conn: &Connection) -> DbResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM sqlite_master
         WHERE type = 'trigger'
           AND tbl_name = 'notes'
           AND name IN ('notes_ai', 'notes_ad', 'notes_au');",
        [],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Chooses and prepares the search backend for one process.
#[derive(Debug, Clone, Copy)]
pub struct SearchIndexManager {
    capability: SearchCapability,
    mode: SearchMode,
}

impl SearchIndexManager {
    pub fn new(capability: SearchCapability, mode: SearchMode) -> Self {
        Self { capability, mode }
    }

    /// Probes `conn` and builds a manager for `mode`.
    pub fn probe(conn: &Connection, mode: SearchMode) -> Self {
        Self::new(SearchCapability::probe(conn), mode)
    }

    pub fn capability(&self) -> SearchCapability {
        self.capability
    }

    /// Prepares storage for the chosen backend and returns it.
    ///
    /// Never fails: any provisioning problem yields the fallback backend.
    pub fn select_backend(&self, conn: &mut Connection) -> Box<dyn SearchBackend> {
        if !self.capability.fts5 {
            if self.mode == SearchMode::Indexed {
                warn!("event=search_select module=search status=degraded reason=fts5_unavailable requested=indexed");
            }
            if let Err(err) = detach_index(conn) {
                warn!("event=search_detach module=search status=error error={err}");
            }
            return fallback("fts5_unavailable");
        }

        if self.mode == SearchMode::Fallback {
            return fallback("forced");
        }

        match provision_index(conn) {
            Ok(rebuilt) => {
                info!(
                    "event=search_select module=search status=ok backend={} rebuilt={}",
                    BackendKind::Indexed,
                    rebuilt
                );
                Box::new(FtsBackend)
            }
            Err(err) => {
                warn!(
                    "event=search_provision module=search status=error error_code=index_provision_failed error={err}"
                );
                if let Err(err) = detach_index(conn) {
                    warn!("event=search_detach module=search status=error error={err}");
                }
                fallback("provision_failed")
            }
        }
    }
}

fn fallback(reason: &str) -> Box<dyn SearchBackend> {
    info!(
        "event=search_select module=search status=ok backend={} reason={}",
        BackendKind::Fallback,
        reason
    );
    Box::new(SubstringBackend)
}
