//! Query engine over the notes table.
//!
//! # Responsibility
//! - Translate a [`NoteQuery`] into one SQL statement using the active
//!   [`SearchBackend`] for text matching.
//! - Apply project, time and limit filters identically for every backend.
//!
//! # Invariants
//! - `limit <= 0` is rejected before any SQL runs.
//! - `since > until` yields an empty result, not an error.
//! - Ordering is the backend rank (if any), then `created_at DESC, id DESC`.

use super::backend::{BackendKind, SearchBackend};
use crate::db::DbError;
use crate::model::note::{Note, ValidationError};
use crate::repo::note_repo::{ensure_positive_limit, parse_note_row, RepoError, NOTE_COLUMNS};
use crate::tagging::normalize_tag;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default result count for `search`.
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// Result type for query APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Query-layer error for validation, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    Validation(ValidationError),
    /// The engine rejected the generated full-text expression.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl SearchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidQuery { .. })
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidQuery { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for SearchError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Db(err) => Self::Db(err),
            RepoError::InvalidData(message) => Self::InvalidData(message),
        }
    }
}

/// Search request: optional text plus filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    /// Free text. `None` or blank lists notes by recency.
    pub text: Option<String>,
    /// Exact project name, compared case-insensitively.
    pub project: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of notes; must be positive.
    pub limit: i64,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            text: None,
            project: None,
            since: None,
            until: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl NoteQuery {
    /// Creates a text query with the default limit and no filters.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a listing query (no text) returning at most `limit` notes.
    pub fn listing(limit: i64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    fn has_empty_window(&self) -> bool {
        matches!((self.since, self.until), (Some(since), Some(until)) if since > until)
    }
}

/// Parses a `since` filter. A bare date means the start of that UTC day.
pub fn parse_since(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    parse_time_bound(value, NaiveTime::from_hms_opt(0, 0, 0))
}

/// Parses an `until` filter. A bare date means the end of that UTC day.
pub fn parse_until(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    parse_time_bound(value, NaiveTime::from_hms_milli_opt(23, 59, 59, 999))
}

fn parse_time_bound(
    value: &str,
    time_of_day: Option<NaiveTime>,
) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidTimeBound {
        value: value.to_string(),
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = time_of_day.ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Runs [`NoteQuery`] requests against one connection and backend.
pub struct QueryEngine<'a> {
    conn: &'a Connection,
    backend: &'a dyn SearchBackend,
}

impl<'a> QueryEngine<'a> {
    pub fn new(conn: &'a Connection, backend: &'a dyn SearchBackend) -> Self {
        Self { conn, backend }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Executes `query` and returns matching notes in result order.
    pub fn query(&self, query: &NoteQuery) -> SearchResult<Vec<Note>> {
        ensure_positive_limit(query.limit)?;
        if query.has_empty_window() {
            return Ok(Vec::new());
        }

        let text_match = query
            .text
            .as_deref()
            .and_then(|text| self.backend.text_match(text));

        let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes");
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        let mut order_by: Vec<&str> = Vec::new();

        if let Some(matched) = text_match.as_ref() {
            if let Some(join) = matched.join {
                sql.push(' ');
                sql.push_str(join);
            }
            clauses.push(matched.predicate.clone());
            bind_values.extend(matched.binds.iter().cloned());
            order_by.extend(matched.rank_order);
        }

        if let Some(project) = query.project.as_deref().and_then(normalize_tag) {
            clauses.push("notes.project = ? COLLATE NOCASE".to_string());
            bind_values.push(Value::Text(project));
        }

        if let Some(since) = query.since {
            clauses.push("notes.created_at >= ?".to_string());
            bind_values.push(Value::Integer(since.timestamp_millis()));
        }

        if let Some(until) = query.until {
            clauses.push("notes.created_at <= ?".to_string());
            bind_values.push(Value::Integer(until.timestamp_millis()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        order_by.extend(["notes.created_at DESC", "notes.id DESC"]);
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.join(", "));
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(query.limit));

        debug!(
            "event=search_query module=search backend={} has_text={} filters={}",
            self.backend.kind(),
            text_match.is_some(),
            clauses.len()
        );

        let match_expr = text_match
            .as_ref()
            .and_then(|matched| matched.binds.first())
            .map(describe_value)
            .unwrap_or_default();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(|err| map_query_error(err, &match_expr))?;
        let mut notes = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| map_query_error(err, &match_expr))?
        {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        other => format!("{other:?}"),
    }
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
