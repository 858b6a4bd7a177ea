//! File logging for the whole process.
//!
//! # Responsibility
//! - Start one size-rotated log file writer under `<data_dir>/logs`.
//! - Record panics as log events before the default hook runs.
//!
//! # Invariants
//! - Events carry ids, counts and durations; note text is never logged.
//! - The first successful call fixes level and directory for the process;
//!   later calls must ask for the same settings.
//! - Nothing here panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;

const LOG_BASENAME: &str = "thinkspace";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: LevelFilter,
    dir: PathBuf,
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

impl LogSettings {
    fn parse(level: &str, dir: &Path) -> Result<Self, String> {
        let name = match level.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            other => other.to_string(),
        };
        let level = LevelFilter::from_str(&name)
            .map_err(|_| format!("unknown log level `{name}`; use trace, debug, info, warn or error"))?;

        if dir.as_os_str().is_empty() || !dir.is_absolute() {
            return Err(format!(
                "log directory must be an absolute path, got `{}`",
                dir.display()
            ));
        }

        Ok(Self {
            level,
            dir: dir.to_path_buf(),
        })
    }
}

/// Starts file logging at `level` into `log_dir`.
///
/// Calling again with the same settings is a no-op. A different level or
/// directory is refused with an error, as is an unknown level or a
/// relative directory. Callers treat any error as "run without logs".
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), String> {
    let wanted = LogSettings::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(wanted.clone()))?;

    if active.settings == wanted {
        return Ok(());
    }
    Err(format!(
        "logging already running with level {} in `{}`; cannot switch to level {} in `{}`",
        active.settings.level,
        active.settings.dir.display(),
        wanted.level,
        wanted.dir.display()
    ))
}

fn start(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir)
        .map_err(|err| format!("cannot create `{}`: {err}", settings.dir.display()))?;

    let handle = Logger::with(LogSpecification::builder().default(settings.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(&settings.dir)
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start file logger: {err}"))?;

    PANIC_HOOK.call_once(install_panic_hook);

    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} version={} os={}",
        settings.level,
        settings.dir.display(),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

/// Level and directory of the running logger, if any.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level, active.settings.dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            panic_summary(panic)
        );
        previous(panic);
    }));
}

// Payloads can quote user input, so only a flattened prefix is kept.
fn panic_summary(panic: &PanicHookInfo<'_>) -> String {
    let payload = panic.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>");
    single_line(message, PANIC_SUMMARY_CHARS)
}

fn single_line(value: &str, max_chars: usize) -> String {
    let mut flat: String = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .take(max_chars)
        .collect();
    if value.chars().count() > max_chars {
        flat.push_str("...");
    }
    flat
}
