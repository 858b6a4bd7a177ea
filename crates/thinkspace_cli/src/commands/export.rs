use super::search::filtered_query;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;
use thinkspace_core::export::render_markdown;
use thinkspace_core::NoteService;

pub const DEFAULT_EXPORT_FILE: &str = "thinkspace-notes.md";
pub const DEFAULT_EXPORT_LIMIT: i64 = 10_000;

#[derive(Args)]
pub struct ExportArgs {
    /// Markdown file to write; replaced if it exists.
    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE, value_name = "FILE")]
    pub out: PathBuf,

    #[arg(short, long)]
    pub project: Option<String>,

    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    #[arg(long, value_name = "DATE")]
    pub until: Option<String>,

    #[arg(long, default_value_t = DEFAULT_EXPORT_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,
}

pub fn run(args: ExportArgs, service: &NoteService<'_>) -> Result<()> {
    let query = filtered_query(
        None,
        args.project,
        args.since.as_deref(),
        args.until.as_deref(),
        args.limit,
    )?;
    let notes = service.search(&query)?;

    std::fs::write(&args.out, render_markdown(&notes))
        .with_context(|| format!("cannot write export to {}", args.out.display()))?;
    info!(
        "event=export_write module=cli status=ok notes={}",
        notes.len()
    );

    output::success(&format!(
        "Exported {} notes to {}",
        notes.len(),
        args.out.display()
    ));
    Ok(())
}
