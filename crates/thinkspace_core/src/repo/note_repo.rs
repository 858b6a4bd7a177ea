//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide durable CRUD over the `notes` table.
//! - Assign `created_at` and merge automatic tags at insertion time.
//!
//! # Invariants
//! - Write paths validate input before touching SQL.
//! - `created_at` never goes backwards relative to stored notes, even when
//!   the clock does.
//! - Listing order is always `created_at DESC, id DESC`.
//! - Index mirroring happens through triggers owned by `search::index`, so
//!   writes here are index-agnostic.

use crate::db::DbError;
use crate::model::note::{NewNote, Note, NoteId, ValidationError};
use crate::tagging::{merge_tags, normalize_tag, Clock, SystemClock};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Column list shared by every note read path.
pub(crate) const NOTE_COLUMNS: &str =
    "notes.id, notes.text, notes.project, notes.tags, notes.created_at, notes.path";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and read operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    /// Whether the caller supplied bad input (as opposed to a storage failure).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Tag frequency row returned by [`NoteRepository::all_tags_with_counts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Repository interface for note storage.
pub trait NoteRepository {
    /// Inserts one note and returns its new id.
    fn insert(&mut self, note: &NewNote) -> RepoResult<NoteId>;
    /// Returns the requested notes in id order. Unknown ids are omitted.
    fn get_by_ids(&self, ids: &[NoteId]) -> RepoResult<Vec<Note>>;
    /// Hard-deletes the requested notes and returns how many existed.
    fn delete_by_ids(&mut self, ids: &[NoteId]) -> RepoResult<usize>;
    /// Most recent notes first.
    fn recent(&self, limit: i64) -> RepoResult<Vec<Note>>;
    /// Tag frequencies, highest count first, ties alphabetical.
    fn all_tags_with_counts(&self, top_n: i64) -> RepoResult<Vec<TagCount>>;
    /// Number of stored notes.
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
    clock: Arc<dyn Clock>,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository over a migrated connection using the wall clock.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    /// Constructs a repository whose insertion timestamps come from `clock`.
    pub fn with_clock(conn: &'conn mut Connection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert(&mut self, note: &NewNote) -> RepoResult<NoteId> {
        let text = note.validated_text()?;
        let project = note.project.as_deref().and_then(normalize_tag);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<i64> =
            tx.query_row("SELECT MAX(created_at) FROM notes;", [], |row| row.get(0))?;
        let now_ms = self.clock.now().timestamp_millis();
        let created_ms = latest.map_or(now_ms, |latest| latest.max(now_ms));
        let created_at = millis_to_datetime(created_ms)?;

        let tags = merge_tags(project.as_deref(), created_at, &note.tags);
        let tags_json = serde_json::to_string(&tags)
            .map_err(|err| RepoError::InvalidData(format!("cannot encode tags: {err}")))?;

        tx.execute(
            "INSERT INTO notes (text, project, tags, created_at, path)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![text, project, tags_json, created_ms, note.path],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(
            "event=note_insert module=repo status=ok id={} tag_count={} has_project={}",
            id,
            tags.len(),
            project.is_some()
        );
        Ok(id)
    }

    fn get_by_ids(&self, ids: &[NoteId]) -> RepoResult<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE notes.id IN ({placeholders})
             ORDER BY notes.id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_by_ids(&mut self, ids: &[NoteId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut removed = 0;
        let mut seen = HashSet::new();
        for id in ids.iter().filter(|id| seen.insert(**id)) {
            let changed = tx.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
            if changed == 0 {
                debug!("event=note_delete module=repo status=skip id={id} reason=not_found");
            }
            removed += changed;
        }
        tx.commit()?;

        info!(
            "event=note_delete module=repo status=ok requested={} removed={}",
            seen.len(),
            removed
        );
        Ok(removed)
    }

    fn recent(&self, limit: i64) -> RepoResult<Vec<Note>> {
        ensure_positive_limit(limit)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             ORDER BY notes.created_at DESC, notes.id DESC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([limit])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn all_tags_with_counts(&self, top_n: i64) -> RepoResult<Vec<TagCount>> {
        ensure_positive_limit(top_n)?;

        let mut stmt = self.conn.prepare(
            "SELECT t.value AS tag, COUNT(*) AS uses
             FROM notes, json_each(notes.tags) AS t
             WHERE t.type = 'text'
             GROUP BY t.value
             ORDER BY uses DESC, t.value ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([top_n])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let uses: i64 = row.get("uses")?;
            counts.push(TagCount {
                tag: row.get("tag")?,
                count: u64::try_from(uses).unwrap_or_default(),
            });
        }
        Ok(counts)
    }

    fn count(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

/// Rejects zero and negative limits.
pub fn ensure_positive_limit(limit: i64) -> Result<(), ValidationError> {
    if limit <= 0 {
        return Err(ValidationError::NonPositiveLimit(limit));
    }
    Ok(())
}

/// Decodes one row selected with [`NOTE_COLUMNS`].
pub(crate) fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;

    let tags_json: String = row.get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid tags `{tags_json}` in notes.tags: {err}"))
    })?;

    let created_ms: i64 = row.get("created_at")?;

    Ok(Note {
        id,
        text: row.get("text")?,
        project: row.get("project")?,
        tags,
        created_at: millis_to_datetime(created_ms)?,
        path: row.get("path")?,
    })
}

/// Converts stored epoch milliseconds back to a UTC timestamp.
pub(crate) fn millis_to_datetime(value: i64) -> RepoResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value).single().ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in notes.created_at"))
    })
}
