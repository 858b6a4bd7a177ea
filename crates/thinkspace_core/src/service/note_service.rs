//! Note use-case service.
//!
//! # Responsibility
//! - Capture notes with project/time tagging from the working directory.
//! - Route search and listing through the query engine and its backend.
//! - Model deletion as plan → confirm → apply, without any prompting here.
//!
//! # Invariants
//! - The backend is chosen before the service is built and never changes.
//! - Deletion only removes ids the caller explicitly confirmed.

use crate::model::note::{NewNote, Note, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError, SqliteNoteRepository, TagCount};
use crate::search::backend::{BackendKind, SearchBackend};
use crate::search::query::{NoteQuery, QueryEngine, SearchError};
use crate::tagging::{detect_project, Clock, SystemClock};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    Repo(RepoError),
    Search(SearchError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl NoteServiceError {
    /// Whether the failure was caused by caller input.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Repo(err) => err.is_validation(),
            Self::Search(err) => err.is_validation(),
            Self::InconsistentState(_) => false,
        }
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<SearchError> for NoteServiceError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Notes found for a delete request, plus the ids that do not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Existing notes, in the order they were requested.
    pub candidates: Vec<Note>,
    /// Requested ids with no stored note.
    pub missing: Vec<NoteId>,
}

impl DeletionPlan {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Pairs candidates with per-note decisions and keeps the approved ids.
    ///
    /// Candidates without a decision are treated as declined.
    pub fn confirmed_ids(&self, decisions: &[bool]) -> Vec<NoteId> {
        self.candidates
            .iter()
            .zip(decisions.iter().copied().chain(std::iter::repeat(false)))
            .filter_map(|(note, approved)| approved.then_some(note.id))
            .collect()
    }

    /// All candidate ids, for unattended deletion.
    pub fn all_ids(&self) -> Vec<NoteId> {
        self.candidates.iter().map(|note| note.id).collect()
    }
}

/// Interprets one line of confirmation input.
///
/// Only `y`/`yes` (any case) approve; empty or unrecognized input declines.
pub fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Removes repeated ids, keeping the first occurrence.
pub fn dedupe_ids(ids: &[NoteId]) -> Vec<NoteId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Note service facade over the SQLite store and a search backend.
pub struct NoteService<'conn> {
    conn: &'conn mut Connection,
    backend: Box<dyn SearchBackend>,
    clock: Arc<dyn Clock>,
}

impl<'conn> NoteService<'conn> {
    /// Creates a service using the wall clock for insertion times.
    pub fn new(conn: &'conn mut Connection, backend: Box<dyn SearchBackend>) -> Self {
        Self {
            conn,
            backend,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for insertion timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn repo(&mut self) -> SqliteNoteRepository<'_> {
        SqliteNoteRepository::with_clock(&mut *self.conn, Arc::clone(&self.clock))
    }

    /// Captures `text` in the context of `cwd`.
    ///
    /// The project is resolved from `cwd`; time buckets and manual tags are
    /// merged by the store.
    pub fn capture(
        &mut self,
        text: &str,
        manual_tags: &[String],
        cwd: &Path,
    ) -> NoteServiceResult<Note> {
        let context = detect_project(cwd);
        let note = NewNote {
            text: text.to_string(),
            project: context.name,
            tags: manual_tags.to_vec(),
            path: cwd.display().to_string(),
        };
        self.capture_note(&note)
    }

    /// Inserts a prepared note and returns it as stored.
    pub fn capture_note(&mut self, note: &NewNote) -> NoteServiceResult<Note> {
        let mut repo = self.repo();
        let id = repo.insert(note)?;
        repo.get_by_ids(&[id])?
            .pop()
            .ok_or(NoteServiceError::InconsistentState(
                "created note not found in read-back",
            ))
    }

    /// Runs a filtered search (or listing when `query.text` is absent).
    pub fn search(&self, query: &NoteQuery) -> NoteServiceResult<Vec<Note>> {
        let engine = QueryEngine::new(&*self.conn, self.backend.as_ref());
        Ok(engine.query(query)?)
    }

    /// Most recent notes first.
    pub fn recent(&mut self, limit: i64) -> NoteServiceResult<Vec<Note>> {
        Ok(self.repo().recent(limit)?)
    }

    /// Most used tags with their counts.
    pub fn top_tags(&mut self, limit: i64) -> NoteServiceResult<Vec<TagCount>> {
        Ok(self.repo().all_tags_with_counts(limit)?)
    }

    /// Looks up the notes a delete request refers to.
    pub fn plan_deletion(&mut self, ids: &[NoteId]) -> NoteServiceResult<DeletionPlan> {
        let requested = dedupe_ids(ids);
        let mut found: HashMap<NoteId, Note> = self
            .repo()
            .get_by_ids(&requested)?
            .into_iter()
            .map(|note| (note.id, note))
            .collect();

        let mut candidates = Vec::new();
        let mut missing = Vec::new();
        for id in requested {
            match found.remove(&id) {
                Some(note) => candidates.push(note),
                None => missing.push(id),
            }
        }

        Ok(DeletionPlan {
            candidates,
            missing,
        })
    }

    /// Deletes confirmed ids and returns how many notes were removed.
    pub fn apply_deletion(&mut self, confirmed: &[NoteId]) -> NoteServiceResult<usize> {
        Ok(self.repo().delete_by_ids(confirmed)?)
    }
}
