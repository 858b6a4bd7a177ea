//! Search entry points.
//!
//! # Responsibility
//! - Probe FTS5 once and provision a trigger-synchronized index over notes.
//! - Hide the indexed/fallback choice behind the [`backend::SearchBackend`]
//!   strategy so query semantics stay identical across engines.
//! - Keep result shaping inside core.

pub mod backend;
pub mod fallback;
pub mod fts;
pub mod index;
pub mod query;
