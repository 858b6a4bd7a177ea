//! Substring search used when FTS5 is unavailable.
//!
//! # Invariants
//! - Matching is case-insensitive for all of Unicode: both sides are
//!   lowered with `casefold`, which every opened connection registers.
//! - `%`, `_` and `\` in user text match literally.
//! - Both `text` and the encoded `tags` column are searched.
//! - No ranking: results keep the recency order.

use super::backend::{BackendKind, SearchBackend, TextMatch};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::Connection;

const CASEFOLD_FN: &str = "casefold";
const SUBSTRING_PREDICATE: &str =
    "(casefold(notes.text) LIKE ? ESCAPE '\\' OR casefold(notes.tags) LIKE ? ESCAPE '\\')";

/// Registers `casefold(text)`: Unicode lowercase, `NULL` stays `NULL`.
///
/// SQLite's own `LIKE` and `lower()` fold ASCII only.
pub(crate) fn register_casefold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CASEFOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}

/// Fallback backend: `LIKE '%text%'` over the notes table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringBackend;

impl SearchBackend for SubstringBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn text_match(&self, text: &str) -> Option<TextMatch> {
        substring_match(text)
    }
}

/// Builds the substring predicate for `text`, or `None` when it is blank.
pub(crate) fn substring_match(text: &str) -> Option<TextMatch> {
    let needle = text.trim();
    if needle.is_empty() {
        return None;
    }

    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Some(TextMatch {
        join: None,
        predicate: SUBSTRING_PREDICATE.to_string(),
        binds: vec![Value::Text(pattern.clone()), Value::Text(pattern)],
        rank_order: None,
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
