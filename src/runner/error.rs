//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint
//! suppressions narrowly.

// The unused_assignments lint fires on miette/thiserror derive expansion in
// some Rust versions but not others, so `#[expect]` cannot be used.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use super::toolchain::Tool;
use crate::c_gen::GenError;
use crate::resolve::ResolveError;
use crate::trace::TraceError;

/// Errors raised while driving the external tools.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The tool could not be started.
    #[error("failed to start {tool} ({program})")]
    #[diagnostic(
        code(gosh_freeze::runner::tool_spawn),
        help("install it or set the matching GOSH_FREEZE_* variable")
    )]
    ToolSpawn {
        /// Which tool.
        tool: Tool,
        /// Program that was executed.
        program: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The tool ran and reported failure.
    #[error("{tool} ({program}) failed with {status}")]
    #[diagnostic(code(gosh_freeze::runner::tool_failed))]
    ToolFailed {
        /// Which tool.
        tool: Tool,
        /// Program that was executed.
        program: Utf8PathBuf,
        /// Its exit status.
        status: ExitStatus,
    },
    /// The tool printed something that is not UTF-8 where text was needed.
    #[error("{tool} produced output that is not valid UTF-8")]
    #[diagnostic(code(gosh_freeze::runner::tool_output))]
    ToolOutput {
        /// Which tool.
        tool: Tool,
    },
    /// Build flags could not be split into words.
    #[error("cannot split {tool} output into arguments: {output:?}")]
    #[diagnostic(code(gosh_freeze::runner::unsplittable_flags))]
    UnsplittableFlags {
        /// Which tool.
        tool: Tool,
        /// The offending output.
        output: String,
    },
    /// The scratch directory has a path the pipeline cannot pass on.
    #[error("scratch directory {} is not valid UTF-8", .path.display())]
    #[diagnostic(code(gosh_freeze::runner::scratch_path))]
    ScratchPath {
        /// The directory.
        path: PathBuf,
    },
    /// No script was given.
    #[error("no script given")]
    #[diagnostic(code(gosh_freeze::runner::missing_script))]
    MissingScript,
    /// A termination signal arrived.
    #[error("interrupted before {stage}")]
    #[diagnostic(code(gosh_freeze::runner::interrupted))]
    Interrupted {
        /// Stage that was about to start.
        stage: &'static str,
    },
}

/// The first `help` text attached to any diagnostic in `err`'s cause chain.
#[must_use]
pub fn diagnostic_help(err: &anyhow::Error) -> Option<String> {
    err.chain()
        .filter_map(as_diagnostic)
        .find_map(|diagnostic| diagnostic.help().map(|help| help.to_string()))
}

fn as_diagnostic<'a>(cause: &'a (dyn StdError + 'static)) -> Option<&'a dyn Diagnostic> {
    cause
        .downcast_ref::<RunnerError>()
        .map(|err| err as &dyn Diagnostic)
        .or_else(|| cause.downcast_ref::<TraceError>().map(|err| err as &dyn Diagnostic))
        .or_else(|| cause.downcast_ref::<GenError>().map(|err| err as &dyn Diagnostic))
        .or_else(|| cause.downcast_ref::<ResolveError>().map(|err| err as &dyn Diagnostic))
}
