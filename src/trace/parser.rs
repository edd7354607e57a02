//! Line-level parsing of the `-fload-verbose` report.
//!
//! `gosh` writes two shapes of line while loading:
//!
//! ```text
//! ;;Loading /usr/share/gauche-0.9/0.9.15/lib/gauche/common-macros.scm...
//! ;;  Loading /usr/share/gauche-0.9/0.9.15/lib/srfi-1.scm...
//! ;;  Dynamically Loading /usr/lib/gauche-0.9/0.9.15/x86_64-pc-linux-gnu/srfi-1.so...
//! ```
//!
//! The run of spaces between `;;` and the verb is the load nesting depth.
//! Extensions are collected regardless of depth, so theirs is dropped.

use camino::Utf8PathBuf;

use super::{LoadEvent, TraceError};

/// A line that is neither blank nor a load report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised load trace line")]
pub struct UnrecognisedLine;

const MARKER: &str = ";;";
const MODULE_VERB: &str = "Loading ";
const EXTENSION_VERB: &str = "Dynamically Loading ";
const ELLIPSIS: &str = "...";

/// Parse a complete trace, one event per non-blank line.
///
/// # Errors
///
/// Returns [`TraceError::Malformed`] for the first line that matches neither
/// shape. Nothing parsed before it is returned.
///
/// # Examples
///
/// ```
/// use gosh_freeze::trace::{LoadEvent, parse_trace};
///
/// let events = parse_trace(";;Loading /lib/a.scm...\n;;  Loading /lib/b.scm...\n")?;
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[1].depth(), 2);
/// # Ok::<(), gosh_freeze::trace::TraceError>(())
/// ```
pub fn parse_trace(text: &str) -> Result<Vec<LoadEvent>, TraceError> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let parsed = parse_line(line).map_err(|UnrecognisedLine| TraceError::Malformed {
            line_number: idx + 1,
            line: line.to_owned(),
        })?;
        events.extend(parsed);
    }
    Ok(events)
}

/// Parse a single trace line.
///
/// Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`UnrecognisedLine`] when the line is neither blank nor a load
/// report.
pub fn parse_line(line: &str) -> Result<Option<LoadEvent>, UnrecognisedLine> {
    let content = line.strip_suffix('\r').unwrap_or(line);
    if content.trim().is_empty() {
        return Ok(None);
    }
    let body = content.strip_prefix(MARKER).ok_or(UnrecognisedLine)?;
    let trimmed = body.trim_start_matches(' ');

    if let Some(rest) = trimmed.strip_prefix(EXTENSION_VERB) {
        let path = identifier(rest)?;
        return Ok(Some(LoadEvent::NativeExtension { path }));
    }

    let depth = body.len() - trimmed.len();
    let rest = trimmed.strip_prefix(MODULE_VERB).ok_or(UnrecognisedLine)?;
    let path = identifier(rest)?;
    Ok(Some(LoadEvent::TextModule { depth, path }))
}

fn identifier(rest: &str) -> Result<Utf8PathBuf, UnrecognisedLine> {
    let raw = rest.strip_suffix(ELLIPSIS).ok_or(UnrecognisedLine)?;
    if raw.is_empty() {
        return Err(UnrecognisedLine);
    }
    Ok(Utf8PathBuf::from(raw))
}
