//! Reads and rewrites the `--max-old-space-size` flag on the last line of the
//! `code-server` launcher.
//!
//! Only the last line is ever changed. Everything before it, and its line
//! terminator, is written back byte-for-byte.

use std::fs;
use std::io::{self, Write as _};
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{Error, Result};

pub const FLAG: &str = "--max-old-space-size";

#[allow(clippy::expect_used)]
static FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--max-old-space-size=(\d+)").expect("flag pattern is a valid regex")
});

/// Whether the launcher's last line currently carries the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    Absent,
    Present(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The flag already had the requested value; nothing was written.
    AlreadySet(u64),
    Inserted(u64),
    Changed { from: u64, to: u64 },
}

impl PatchOutcome {
    #[must_use]
    pub fn wrote_file(self) -> bool {
        !matches!(self, Self::AlreadySet(_))
    }
}

/// How the launcher invokes its bundled node binary.
pub const RUNTIME_TOKEN: &str = "\"$ROOT/node\"";

pub fn inspect(path: &Path) -> Result<PatchState> {
    let text = read(path)?;
    Ok(state_of(&text))
}

/// Sets the flag on the last line of `path` to `target`, inserting it after the
/// runtime invocation if it is not there yet.
pub fn apply(path: &Path, target: u64) -> Result<PatchOutcome> {
    let text = read(path)?;

    match plan(&text, target) {
        Edit::Keep(value) => {
            debug!(path = %path.display(), value, "flag already set");
            Ok(PatchOutcome::AlreadySet(value))
        }
        Edit::Rewrite { content, outcome } => {
            write_atomic(path, &content)?;
            debug!(path = %path.display(), ?outcome, "launcher rewritten");
            Ok(outcome)
        }
        Edit::NoToken => Err(Error::RuntimeTokenMissing {
            path: path.to_path_buf(),
            token: RUNTIME_TOKEN.to_string(),
        }),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Edit {
    Keep(u64),
    Rewrite {
        content: String,
        outcome: PatchOutcome,
    },
    NoToken,
}

fn state_of(text: &str) -> PatchState {
    let line = &text[last_line_bounds(text)];
    match find_flag(line) {
        Some((_, value)) => PatchState::Present(value),
        None => PatchState::Absent,
    }
}

fn plan(text: &str, target: u64) -> Edit {
    let bounds = last_line_bounds(text);
    let line = &text[bounds.clone()];

    let (new_line, outcome) = if let Some((digits, current)) = find_flag(line) {
        if current == target {
            return Edit::Keep(current);
        }
        let new_line = format!("{}{target}{}", &line[..digits.start], &line[digits.end..]);
        (
            new_line,
            PatchOutcome::Changed {
                from: current,
                to: target,
            },
        )
    } else if let Some(pos) = line.find(RUNTIME_TOKEN) {
        let at = pos + RUNTIME_TOKEN.len();
        let new_line = format!("{} {FLAG}={target}{}", &line[..at], &line[at..]);
        (new_line, PatchOutcome::Inserted(target))
    } else {
        return Edit::NoToken;
    };

    let mut content = String::with_capacity(text.len() + 32);
    content.push_str(&text[..bounds.start]);
    content.push_str(&new_line);
    content.push_str(&text[bounds.end..]);
    Edit::Rewrite { content, outcome }
}

/// Byte range of the last line, without its `\n` or `\r\n` terminator.
fn last_line_bounds(text: &str) -> Range<usize> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_suffix('\r').unwrap_or(body);
    let start = body.rfind('\n').map_or(0, |i| i + 1);
    start..body.len()
}

/// Location of the flag's digits in `line` and their value. A value too large
/// for `u64` reads as `u64::MAX` so it is still replaced.
fn find_flag(line: &str) -> Option<(Range<usize>, u64)> {
    let digits = FLAG_RE.captures(line)?.get(1)?;
    let value = digits.as_str().parse().unwrap_or(u64::MAX);
    Some((digits.range(), value))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes next to `path` and renames over it, keeping the original permissions.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).map_err(write_err)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.as_file().set_permissions(permissions).map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
