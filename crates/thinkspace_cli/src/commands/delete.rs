use crate::output;
use anyhow::Result;
use clap::Args;
use std::io::{self, BufRead, Write};
use thinkspace_core::export::snippet;
use thinkspace_core::{parse_confirmation, Note, NoteId, NoteService};

const PREVIEW_CHARS: usize = 60;
pub const DEFAULT_PICKER_LIMIT: i64 = 20;

#[derive(Args)]
pub struct DeleteArgs {
    /// Ids of the notes to delete.
    #[arg(value_name = "ID", required_unless_present = "interactive")]
    pub ids: Vec<NoteId>,

    /// Delete without asking.
    #[arg(short, long)]
    pub yes: bool,

    /// Pick notes to delete from the most recent ones.
    #[arg(short, long)]
    pub interactive: bool,

    /// How many recent notes the picker shows.
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_PICKER_LIMIT,
        allow_negative_numbers = true
    )]
    pub limit: i64,
}

pub fn run(args: DeleteArgs, service: &mut NoteService<'_>) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let mut targets = Vec::new();
    if args.interactive {
        let recent = service.recent(args.limit)?;
        if recent.is_empty() {
            output::info("No recent notes to choose from.");
        } else {
            targets.extend(pick(&mut input, &recent)?);
        }
    }
    targets.extend(args.ids);
    if targets.is_empty() {
        output::info("No notes selected for deletion.");
        return Ok(());
    }

    let plan = service.plan_deletion(&targets)?;
    for id in &plan.missing {
        output::warn(&format!("note #{id} not found; skipping"));
    }
    if plan.is_empty() {
        output::info("No notes to delete.");
        return Ok(());
    }

    let confirmed = if args.yes {
        plan.all_ids()
    } else {
        let decisions = plan
            .candidates
            .iter()
            .map(|note| confirm(&mut input, note))
            .collect::<Result<Vec<_>>>()?;
        plan.confirmed_ids(&decisions)
    };

    for note in plan
        .candidates
        .iter()
        .filter(|note| !confirmed.contains(&note.id))
    {
        output::info(&format!("Skipped note #{}", note.id));
    }

    let removed = service.apply_deletion(&confirmed)?;
    let requested = plan.candidates.len() + plan.missing.len();
    output::success(&format!("Deleted {removed} of {requested} requested notes"));
    Ok(())
}

/// Asks about one note. End of input counts as "no".
fn confirm(input: &mut impl BufRead, note: &Note) -> Result<bool> {
    print!(
        "Delete note #{}? Preview: {} [y/N] ",
        note.id,
        snippet(&note.text, PREVIEW_CHARS)
    );
    io::stdout().flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line)?;
    Ok(read > 0 && parse_confirmation(&line))
}

/// One line typed at the picker prompt.
#[derive(Debug, PartialEq, Eq)]
enum PickerInput {
    Cancel,
    Confirm,
    Toggle {
        ids: Vec<NoteId>,
        ignored: Vec<String>,
    },
}

/// Reads a picker line. Tokens are split on commas and whitespace; a token
/// that is not one of the `offered` ids is ignored.
fn parse_picker_input(line: &str, offered: &[NoteId]) -> PickerInput {
    let line = line.trim();
    if line.is_empty() {
        return PickerInput::Confirm;
    }
    if matches!(line.to_ascii_lowercase().as_str(), "q" | "quit") {
        return PickerInput::Cancel;
    }

    let mut ids = Vec::new();
    let mut ignored = Vec::new();
    for token in line
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        match token.parse::<NoteId>() {
            Ok(id) if offered.contains(&id) => ids.push(id),
            _ => ignored.push(token.to_string()),
        }
    }
    PickerInput::Toggle { ids, ignored }
}

/// Flips each id in or out of `selected`.
fn toggle(selected: &mut Vec<NoteId>, ids: &[NoteId]) {
    for id in ids {
        match selected.iter().position(|picked| picked == id) {
            Some(at) => {
                selected.remove(at);
            }
            None => selected.push(*id),
        }
    }
}

/// Lets the user toggle ids from `notes` until they confirm.
///
/// Returns the picked ids in the order `notes` lists them. Cancelling or
/// reaching end of input picks nothing.
fn pick(input: &mut impl BufRead, notes: &[Note]) -> Result<Vec<NoteId>> {
    let offered = notes.iter().map(|note| note.id).collect::<Vec<_>>();
    let mut selected = Vec::new();

    loop {
        output::picker_table(notes, &selected);
        output::hint("toggle notes by typing ids separated by spaces or commas");
        output::hint("press Enter to confirm, or type `q` to cancel");
        print!("select> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            output::info("Selection cancelled.");
            return Ok(Vec::new());
        }

        match parse_picker_input(&line, &offered) {
            PickerInput::Cancel => {
                output::info("Selection cancelled.");
                return Ok(Vec::new());
            }
            PickerInput::Confirm if selected.is_empty() => {
                output::warn("no notes selected yet");
            }
            PickerInput::Confirm => {
                return Ok(offered
                    .into_iter()
                    .filter(|id| selected.contains(id))
                    .collect());
            }
            PickerInput::Toggle { ids, ignored } => {
                toggle(&mut selected, &ids);
                if !ignored.is_empty() {
                    output::warn(&format!("ignored: {}", ignored.join(", ")));
                }
            }
        }
    }
}
