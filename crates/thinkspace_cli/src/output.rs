//! Terminal rendering for command results.
//!
//! Color is decided once in `main`; everything here goes through `colored`,
//! which emits plain text when stdout is not a terminal.

use colored::Colorize;
use thinkspace_core::export::{format_timestamp, highlight_terms, snippet};
use thinkspace_core::{Note, NoteId, TagCount};

const TABLE_SNIPPET_CHARS: usize = 80;
const PICKER_SNIPPET_CHARS: usize = 60;

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn info(msg: &str) {
    println!("{msg}");
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Prints an error and the distinct messages of its causes.
pub fn error_chain(err: &anyhow::Error) {
    eprintln!("{} {}", "error:".red().bold(), err);

    let mut previous = err.to_string();
    for cause in err.chain().skip(1) {
        let message = cause.to_string();
        if !previous.contains(&message) {
            eprintln!("  {} {}", "caused by:".dimmed(), message);
        }
        previous = message;
    }
}

/// Renders notes as an aligned table; the text column comes last so
/// highlighting never disturbs alignment.
pub fn notes_table(title: &str, notes: &[Note], highlight: Option<&str>) {
    header(title);

    let rows = notes
        .iter()
        .map(|note| {
            [
                note.id.to_string(),
                format_timestamp(note),
                note.project.clone().unwrap_or_else(|| "-".to_string()),
                note.tags.join(", "),
            ]
        })
        .collect::<Vec<_>>();
    let labels = ["ID", "When", "Project", "Tags"];
    let widths = column_widths(&labels, &rows);

    println!(
        "{}  {}",
        pad_row(&labels.map(str::to_string), &widths).as_str().bold(),
        "Text".bold()
    );
    for (note, row) in notes.iter().zip(rows.iter()) {
        let text = snippet(&note.text, TABLE_SNIPPET_CHARS);
        let text = match highlight {
            Some(query) => highlight_terms(&text, query, |term| term.reversed().to_string()),
            None => text,
        };
        println!("{}  {}", pad_row(row, &widths), text);
    }
}

/// Recent notes with a `[x]` mark on the selected ids.
pub fn picker_table(notes: &[Note], selected: &[NoteId]) {
    header("Select notes to delete");

    let rows = notes
        .iter()
        .map(|note| {
            let mark = if selected.contains(&note.id) { "[x]" } else { "[ ]" };
            [
                mark.to_string(),
                note.id.to_string(),
                format_timestamp(note),
                note.project.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    let labels = ["Pick", "ID", "When", "Project"];
    let widths = column_widths(&labels, &rows);

    println!(
        "{}  {}",
        pad_row(&labels.map(str::to_string), &widths).as_str().bold(),
        "Text".bold()
    );
    for (note, row) in notes.iter().zip(rows.iter()) {
        println!(
            "{}  {}",
            pad_row(row, &widths),
            snippet(&note.text, PICKER_SNIPPET_CHARS)
        );
    }
}

pub fn tags_table(counts: &[TagCount]) {
    header("Top tags");

    let rows = counts
        .iter()
        .map(|entry| [entry.tag.clone(), entry.count.to_string()])
        .collect::<Vec<_>>();
    let labels = ["Tag", "Count"];
    let widths = column_widths(&labels, &rows);

    println!(
        "{}",
        pad_row(&labels.map(str::to_string), &widths).as_str().bold()
    );
    for row in &rows {
        println!("{}", pad_row(row, &widths));
    }
}

fn column_widths<const N: usize>(labels: &[&str; N], rows: &[[String; N]]) -> [usize; N] {
    let mut widths: [usize; N] = std::array::from_fn(|i| labels[i].chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn pad_row<const N: usize>(cells: &[String; N], widths: &[usize; N]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
