//! Domain model for captured notes.
//!
//! # Responsibility
//! - Define the persisted `Note` record and the `NewNote` write request.
//! - Own caller-input validation shared by store and query paths.
//!
//! # Invariants
//! - Every note is identified by a store-assigned `NoteId`.
//! - Deletion is a hard delete; ids are never reused.

pub mod note;
