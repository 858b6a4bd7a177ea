//! Project and time tag derivation.
//!
//! # Responsibility
//! - Resolve the project a note was captured in from the working directory.
//! - Derive `YYYY`, `YYYY-MM`, `YYYY-MM-DD` buckets from a UTC timestamp.
//! - Merge automatic and manual tags into one ordered, deduplicated list.
//!
//! # Invariants
//! - Derivation is a pure function of `(cwd, clock)`: no subprocess, no
//!   network, no writes.
//! - Project resolution fails soft to `None`.
//! - Time buckets are always computed in UTC.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Source of the current time for insertion timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock whose time only moves when told to. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, value: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = value;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current
            .lock()
            .map(|current| *current)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Project resolved from a working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    /// Repository top-level name, or the directory name outside a repository.
    pub name: Option<String>,
    /// Directory the name was taken from.
    pub root: Option<PathBuf>,
    /// Whether `root` is a version-controlled repository.
    pub is_repository: bool,
}

/// Resolves the project for `cwd`.
///
/// The nearest ancestor (including `cwd`) holding a `.git` entry wins. A
/// `.git` file counts too, which covers worktrees and submodules. Outside a
/// repository the immediate directory name is used.
pub fn detect_project(cwd: &Path) -> ProjectContext {
    let resolved = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());

    if let Some(root) = resolved
        .ancestors()
        .find(|dir| dir.join(".git").exists())
    {
        if let Some(name) = dir_name(root) {
            return ProjectContext {
                name: Some(name),
                root: Some(root.to_path_buf()),
                is_repository: true,
            };
        }
    }

    match dir_name(&resolved) {
        Some(name) => ProjectContext {
            name: Some(name),
            root: Some(resolved),
            is_repository: false,
        },
        None => ProjectContext::default(),
    }
}

/// Returns `[YYYY, YYYY-MM, YYYY-MM-DD]` for `at` in UTC.
pub fn time_bucket_tags(at: DateTime<Utc>) -> [String; 3] {
    [
        at.format("%Y").to_string(),
        at.format("%Y-%m").to_string(),
        at.format("%Y-%m-%d").to_string(),
    ]
}

/// Normalizes one tag value. Blank values are dropped.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalizes and deduplicates tags, keeping the first spelling seen.
///
/// Duplicates are detected case-insensitively.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for tag in tags {
        let Some(value) = normalize_tag(tag.as_ref()) else {
            continue;
        };
        if seen.insert(value.to_lowercase()) {
            merged.push(value);
        }
    }
    merged
}

/// Merges project tag, time buckets and manual tags in that order.
pub fn merge_tags(project: Option<&str>, at: DateTime<Utc>, manual: &[String]) -> Vec<String> {
    let buckets = time_bucket_tags(at);
    let auto = project
        .into_iter()
        .chain(buckets.iter().map(String::as_str));
    normalize_tags(auto.chain(manual.iter().map(String::as_str)))
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(normalize_tag)
}
