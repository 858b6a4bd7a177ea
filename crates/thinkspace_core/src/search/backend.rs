//! Strategy interface shared by the indexed and fallback search backends.
//!
//! A backend only decides how free text narrows the `notes` table and how
//! matches are ranked. Project, time and limit filters belong to the query
//! engine and are applied the same way for every backend.

use rusqlite::types::Value;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Which backend is serving queries for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// FTS5 virtual table with bm25 ranking.
    Indexed,
    /// Case-insensitive substring matching on the notes table.
    Fallback,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Fallback => "fallback",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL fragments that restrict `notes` to rows matching some text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// Extra join needed by the predicate, if any.
    pub join: Option<&'static str>,
    /// Boolean SQL expression using `?` placeholders.
    pub predicate: String,
    /// Values bound to the placeholders of `predicate`, in order.
    pub binds: Vec<Value>,
    /// Relevance ordering placed before the recency tie-break.
    pub rank_order: Option<&'static str>,
}

/// Text-matching strategy selected once per process.
pub trait SearchBackend {
    fn kind(&self) -> BackendKind;

    /// Builds the match for `text`.
    ///
    /// Returns `None` when `text` has nothing to match on; the query then
    /// behaves like a plain listing.
    fn text_match(&self, text: &str) -> Option<TextMatch>;
}
