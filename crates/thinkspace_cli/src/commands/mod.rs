pub mod db_path;
pub mod delete;
pub mod export;
pub mod list;
pub mod note;
pub mod search;
pub mod tags;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use thinkspace_core::db::open_db;
use thinkspace_core::{
    init_logging, AppConfig, NoteService, NoteServiceError, SearchIndexManager, SearchMode,
    ValidationError,
};

#[derive(Parser)]
#[command(
    name = "thinkspace",
    author,
    version,
    about = "Thinkspace - context-aware scratchpad for coders",
    long_about = "Capture short notes from the terminal. Every note is tagged with the \
                  current project\nand the day it was written, and can be found again with \
                  full-text search."
)]
pub struct Cli {
    /// Directory holding notes.db and logs.
    #[arg(long, global = true, env = "THINKSPACE_HOME", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error. Defaults to debug in debug builds, info otherwise.
    #[arg(long, global = true, env = "THINKSPACE_LOG", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// auto|indexed|fallback.
    #[arg(
        long,
        global = true,
        env = "THINKSPACE_SEARCH_MODE",
        value_name = "MODE",
        default_value_t = SearchMode::Auto
    )]
    pub search_mode: SearchMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Capture a quick note, tagged by project and time")]
    Note(note::NoteArgs),

    #[command(about = "Search notes by text and optional filters")]
    Search(search::SearchArgs),

    #[command(about = "List the most recent notes")]
    List(list::ListArgs),

    #[command(about = "Show the most used tags")]
    Tags(tags::TagsArgs),

    #[command(about = "Print the database path")]
    DbPath,

    #[command(about = "Export notes to Markdown")]
    Export(export::ExportArgs),

    #[command(about = "Delete notes by id or from a picker")]
    Delete(delete::DeleteArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Note(_) => "note",
            Self::Search(_) => "search",
            Self::List(_) => "list",
            Self::Tags(_) => "tags",
            Self::DbPath => "db-path",
            Self::Export(_) => "export",
            Self::Delete(_) => "delete",
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::resolve(cli.data_dir.as_deref(), cli.search_mode)?;
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }

    if let Commands::DbPath = cli.command {
        return db_path::run(&config);
    }

    if let Err(err) = init_logging(&config.log_level, &config.log_dir()) {
        crate::output::warn(&format!("logging disabled: {err}"));
    }
    info!(
        "event=command_start module=cli command={} search_mode={}",
        cli.command.name(),
        config.search_mode
    );

    let store_path = config.db_path();
    let mut conn = open_db(&store_path)
        .with_context(|| format!("cannot open note store at {}", store_path.display()))?;
    let backend = SearchIndexManager::probe(&conn, config.search_mode).select_backend(&mut conn);
    let mut service = NoteService::new(&mut conn, backend);

    match cli.command {
        Commands::Note(args) => note::run(args, &mut service),
        Commands::Search(args) => search::run(args, &service),
        Commands::List(args) => list::run(args, &mut service),
        Commands::Tags(args) => tags::run(args, &mut service),
        Commands::Export(args) => export::run(args, &service),
        Commands::Delete(args) => delete::run(args, &mut service),
        Commands::DbPath => db_path::run(&config),
    }
}

/// 2 when the failure came from caller input, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let is_validation = err.chain().any(|cause| {
        cause.downcast_ref::<ValidationError>().is_some()
            || cause
                .downcast_ref::<NoteServiceError>()
                .is_some_and(NoteServiceError::is_validation)
    });
    if is_validation {
        2
    } else {
        1
    }
}
