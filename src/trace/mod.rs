//! Load trace capture and parsing.
//!
//! `gosh` reports every file it loads when run with `-fload-verbose`. The
//! [`capture`] submodule runs the interpreter against the user script and
//! collects that report; [`parser`] turns it into an ordered list of
//! [`LoadEvent`]s.

pub mod capture;
pub mod parser;

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

pub use capture::{TraceCommand, capture_trace};
pub use parser::{parse_line, parse_trace};

/// The two kinds of load the runtime reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    /// A Scheme source file evaluated into the runtime.
    TextModule,
    /// A shared object opened with `dynamic-load`.
    NativeExtension,
}

/// One line of the load trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadEvent {
    /// A source module loaded at the given nesting depth.
    TextModule {
        /// Number of indentation spaces in front of `Loading`.
        depth: usize,
        /// Path of the loaded file.
        path: Utf8PathBuf,
    },
    /// A native extension. Extensions carry no nesting information.
    NativeExtension {
        /// Path of the shared object.
        path: Utf8PathBuf,
    },
}

impl LoadEvent {
    /// Which kind of load produced this event.
    #[must_use]
    pub const fn kind(&self) -> LoadKind {
        match self {
            Self::TextModule { .. } => LoadKind::TextModule,
            Self::NativeExtension { .. } => LoadKind::NativeExtension,
        }
    }

    /// The loaded file.
    #[must_use]
    pub fn identifier(&self) -> &Utf8Path {
        match self {
            Self::TextModule { path, .. } | Self::NativeExtension { path } => path,
        }
    }

    /// Nesting depth; native extensions always report zero.
    #[must_use]
    pub const fn depth(&self) -> usize {
        match self {
            Self::TextModule { depth, .. } => *depth,
            Self::NativeExtension { .. } => 0,
        }
    }
}

/// Errors raised while capturing or parsing the load trace.
#[derive(Debug, Error, Diagnostic)]
pub enum TraceError {
    /// A non-blank trace line matched neither recognised shape.
    #[error("malformed load trace at line {line_number}: {line:?}")]
    #[diagnostic(
        code(gosh_freeze::trace::malformed),
        help("the script may write to stderr while it loads; keep load-time output on stdout")
    )]
    Malformed {
        /// One-based line number within the captured trace.
        line_number: usize,
        /// The offending line, verbatim.
        line: String,
    },
    /// The interpreter could not be started.
    #[error("failed to run {program}")]
    #[diagnostic(
        code(gosh_freeze::trace::spawn),
        help("install Gauche, or point --gosh or GOSH_FREEZE_GOSH at the interpreter")
    )]
    Spawn {
        /// Interpreter that was invoked.
        program: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The interpreter wrote something that is not UTF-8 to its error stream.
    #[error("load trace from {program} is not valid UTF-8")]
    #[diagnostic(code(gosh_freeze::trace::encoding))]
    Encoding {
        /// Interpreter that was invoked.
        program: Utf8PathBuf,
    },
}
