use crate::output;
use anyhow::Result;
use clap::Args;
use thinkspace_core::NoteService;

pub const DEFAULT_TAGS_LIMIT: i64 = 50;

#[derive(Args)]
pub struct TagsArgs {
    #[arg(long, default_value_t = DEFAULT_TAGS_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,
}

pub fn run(args: TagsArgs, service: &mut NoteService<'_>) -> Result<()> {
    let counts = service.top_tags(args.limit)?;
    if counts.is_empty() {
        output::hint("no tags yet; capture one with `thinkspace note \"...\"`");
        return Ok(());
    }

    output::tags_table(&counts);
    Ok(())
}
