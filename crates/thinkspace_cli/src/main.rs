//! `thinkspace` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments and dispatch to one command per process.
//! - Map failures to exit codes: 2 for bad input, 1 for everything else.

use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;

mod commands;
mod output;

use commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    colored::control::set_override(std::io::stdout().is_terminal());

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error_chain(&err);
            ExitCode::from(commands::exit_code(&err))
        }
    }
}
