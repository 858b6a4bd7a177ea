use crate::output;
use anyhow::Result;
use clap::Args;
use thinkspace_core::NoteService;

pub const DEFAULT_LIST_LIMIT: i64 = 20;

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Print notes as a JSON array.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ListArgs, service: &mut NoteService<'_>) -> Result<()> {
    let notes = service.recent(args.limit)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }
    if notes.is_empty() {
        output::hint("no notes yet; capture one with `thinkspace note \"...\"`");
        return Ok(());
    }

    output::notes_table("Recent notes", &notes, None);
    Ok(())
}
