//! Note domain model.
//!
//! # Invariants
//! - `text` is trimmed and never empty.
//! - `tags` always contains the three time buckets of `created_at`.
//! - `created_at` is assigned by the store, never by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned note identifier (`notes.id`).
pub type NoteId = i64;

/// A persisted note as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// User-supplied text, trimmed.
    pub text: String,
    /// Repository or directory name resolved at capture time.
    pub project: Option<String>,
    /// Project tag, time buckets and manual tags, first occurrence wins.
    pub tags: Vec<String>,
    /// Insertion time in UTC, millisecond precision.
    pub created_at: DateTime<Utc>,
    /// Working directory at capture time. Provenance only.
    pub path: String,
}

/// Write request for a new note.
///
/// `tags` holds only the manual tags; automatic tags are merged by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub text: String,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub path: String,
}

impl NewNote {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Returns the trimmed text, or an error when nothing remains.
    pub fn validated_text(&self) -> Result<&str, ValidationError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(trimmed)
    }
}

/// Bad caller input. Reported before any storage work is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Note text is empty after trimming.
    EmptyText,
    /// Result limit must be at least 1.
    NonPositiveLimit(i64),
    /// A `since`/`until` filter could not be parsed.
    InvalidTimeBound { value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text cannot be empty"),
            Self::NonPositiveLimit(limit) => {
                write!(f, "limit must be a positive integer, got {limit}")
            }
            Self::InvalidTimeBound { value } => write!(
                f,
                "invalid date filter `{value}`; expected YYYY-MM-DD or an RFC 3339 timestamp"
            ),
        }
    }
}

impl Error for ValidationError {}
