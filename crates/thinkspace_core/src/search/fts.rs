//! SQLite FTS5-backed search backend.
//!
//! # Responsibility
//! - Turn free text into a safe FTS5 `MATCH` expression.
//! - Rank matches with `bm25`.
//!
//! # Invariants
//! - User text is never passed through as raw FTS5 syntax.
//! - Every term is quoted and prefix-matched; terms are ANDed.
//! - A term is kept only when it holds a character the `unicode61`
//!   tokenizer indexes (letters, numbers, private use). Terms made only of
//!   punctuation or combining marks are dropped; when none remain the
//!   substring match is used instead.

use super::backend::{BackendKind, SearchBackend, TextMatch};
use super::fallback::substring_match;
use rusqlite::types::Value;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Indexed backend over the `notes_fts` virtual table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtsBackend;

impl SearchBackend for FtsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
    }

    fn text_match(&self, text: &str) -> Option<TextMatch> {
        if text.trim().is_empty() {
            return None;
        }

        let Some(match_expr) = build_match_expression(text) else {
            return substring_match(text);
        };

        Some(TextMatch {
            join: Some("JOIN notes_fts ON notes_fts.rowid = notes.id"),
            predicate: "notes_fts MATCH ?".to_string(),
            binds: vec![Value::Text(match_expr)],
            rank_order: Some("bm25(notes_fts)"),
        })
    }
}

/// Builds `"term1"* AND "term2"*` from whitespace-separated input.
pub fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .filter(|term| term.chars().any(is_token_char))
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

/// Matches the `unicode61` token classes: L*, N* and Co.
///
/// Marks are excluded even where Rust counts them as alphabetic.
fn is_token_char(ch: char) -> bool {
    use GeneralCategory::*;
    matches!(
        get_general_category(ch),
        UppercaseLetter
            | LowercaseLetter
            | TitlecaseLetter
            | ModifierLetter
            | OtherLetter
            | DecimalNumber
            | LetterNumber
            | OtherNumber
            | PrivateUse
    )
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"*")
}
