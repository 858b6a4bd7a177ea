use crate::output;
use anyhow::Result;
use clap::Args;
use thinkspace_core::{parse_since, parse_until, NoteQuery, NoteService, DEFAULT_SEARCH_LIMIT};

#[derive(Args)]
pub struct SearchArgs {
    /// Words to look for. Every word must match.
    #[arg(
        required = true,
        value_name = "QUERY",
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    pub query: Vec<String>,

    /// Only notes from this project (case-insensitive).
    #[arg(short, long)]
    pub project: Option<String>,

    /// Lower bound, YYYY-MM-DD or RFC 3339.
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Upper bound, YYYY-MM-DD (whole day) or RFC 3339.
    #[arg(long, value_name = "DATE")]
    pub until: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Print results as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Builds a query from the shared `--project/--since/--until` filters.
pub fn filtered_query(
    text: Option<String>,
    project: Option<String>,
    since: Option<&str>,
    until: Option<&str>,
    limit: i64,
) -> Result<NoteQuery> {
    let mut query = NoteQuery::listing(limit);
    query.text = text;
    query.project = project;
    query.since = since.map(parse_since).transpose()?;
    query.until = until.map(parse_until).transpose()?;
    Ok(query)
}

pub fn run(args: SearchArgs, service: &NoteService<'_>) -> Result<()> {
    let text = args.query.join(" ");
    let query = filtered_query(
        Some(text.clone()),
        args.project,
        args.since.as_deref(),
        args.until.as_deref(),
        args.limit,
    )?;

    let notes = service.search(&query)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }
    if notes.is_empty() {
        output::info("No matches.");
        return Ok(());
    }

    output::notes_table(
        &format!("Results ({})", service.backend_kind()),
        &notes,
        Some(&text),
    );
    Ok(())
}
