//! Core storage and search logic for Thinkspace.
//! This crate is the single source of truth for note invariants.

pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod tagging;

pub use config::{AppConfig, ConfigError, SearchMode};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{NewNote, Note, NoteId, ValidationError};
pub use repo::note_repo::{
    NoteRepository, RepoError, RepoResult, SqliteNoteRepository, TagCount,
};
pub use search::backend::{BackendKind, SearchBackend};
pub use search::fallback::SubstringBackend;
pub use search::fts::FtsBackend;
pub use search::index::{SearchCapability, SearchIndexManager};
pub use search::query::{
    parse_since, parse_until, NoteQuery, QueryEngine, SearchError, SearchResult,
    DEFAULT_SEARCH_LIMIT,
};
pub use service::note_service::{
    parse_confirmation, DeletionPlan, NoteService, NoteServiceError, NoteServiceResult,
};
pub use tagging::{detect_project, time_bucket_tags, Clock, ManualClock, SystemClock};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
