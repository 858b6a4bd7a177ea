use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use thinkspace_core::NoteService;

#[derive(Args)]
pub struct NoteArgs {
    /// The note text. Multiple words are joined with spaces.
    #[arg(required = true, value_name = "TEXT")]
    pub text: Vec<String>,

    /// Extra tag; repeat for several.
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

pub fn run(args: NoteArgs, service: &mut NoteService<'_>) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let text = args.text.join(" ");

    let note = service.capture(&text, &args.tags, &cwd)?;

    output::success(&format!("Saved note #{}", note.id));
    output::info(&format!(
        "Project: {}",
        note.project.as_deref().unwrap_or("-")
    ));
    output::info(&format!("Tags: {}", note.tags.join(", ")));
    Ok(())
}
