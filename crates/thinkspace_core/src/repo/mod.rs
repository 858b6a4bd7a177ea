//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate caller input before persistence.
//! - Deleting an unknown id is not an error; callers compare counts.

pub mod note_repo;
