//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate tagging, storage and search into use-case level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod note_service;
