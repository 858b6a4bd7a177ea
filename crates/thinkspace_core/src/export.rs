//! Text rendering helpers: Markdown export, table snippets, term highlights.

use crate::model::note::Note;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const EXPORT_TITLE: &str = "# Thinkspace Export";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders notes as one Markdown document, oldest note first.
pub fn render_markdown(notes: &[Note]) -> String {
    let mut ordered: Vec<&Note> = notes.iter().collect();
    ordered.sort_by_key(|note| (note.created_at, note.id));

    let mut lines = vec![EXPORT_TITLE.to_string(), String::new()];
    for note in ordered {
        lines.push(format!("## Note #{}", note.id));
        lines.push(format!("- **When:** {}", format_timestamp(note)));
        lines.push(format!(
            "- **Project:** {}",
            note.project.as_deref().unwrap_or("-")
        ));
        lines.push(format!("- **Tags:** {}", note.tags.join(", ")));
        lines.push(String::new());
        lines.push(note.text.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Formats a timestamp the way tables and exports show it.
pub fn format_timestamp(note: &Note) -> String {
    note.created_at.format(TIMESTAMP_FORMAT).to_string()
}

/// Collapses whitespace to single spaces and caps the length at
/// `max_chars`, ending truncated text with `…`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    if collapsed.chars().count() <= max_chars {
        return collapsed.into_owned();
    }

    let mut truncated: String = collapsed
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect();
    truncated.push('…');
    truncated
}

/// Passes every case-insensitive occurrence of a query term through `mark`.
pub fn highlight_terms<F>(text: &str, query: &str, mark: F) -> String
where
    F: Fn(&str) -> String,
{
    let alternatives = query
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>();
    if alternatives.is_empty() {
        return text.to_string();
    }

    match RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern
            .replace_all(text, |caps: &regex::Captures<'_>| mark(&caps[0]))
            .into_owned(),
        Err(_) => text.to_string(),
    }
}
