//! Subprocess helpers for the build pipeline.
//!
//! Every tool runs to completion with stdin closed and stderr passed through
//! to the user. Tools whose output the pipeline needs have stdout captured;
//! the rest inherit it.

use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::error::RunnerError;
use super::toolchain::Tool;

/// Build a command for `program` with the pipeline's standard streams.
pub(super) fn command(program: &Utf8Path) -> Command {
    let mut cmd = Command::new(program.as_std_path());
    cmd.stdin(Stdio::null()).stderr(Stdio::inherit());
    cmd
}

/// Render `cmd` as a shell-quoted line for logs.
pub(super) fn display_command(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let words: Vec<&str> = std::iter::once(program.as_str())
        .chain(args.iter().map(String::as_str))
        .collect();
    shlex::try_join(words.iter().copied()).unwrap_or_else(|_| words.join(" "))
}

fn log_command_execution(cmd: &Command) {
    info!("Running command: {}", display_command(cmd));
}

fn program_of(cmd: &Command) -> Utf8PathBuf {
    Utf8PathBuf::from(cmd.get_program().to_string_lossy().into_owned())
}

/// Run `cmd` to completion, inheriting stdout.
///
/// # Errors
///
/// Returns [`RunnerError::ToolSpawn`] if the program cannot start and
/// [`RunnerError::ToolFailed`] on a non-zero exit.
pub(super) fn run_status(tool: Tool, mut cmd: Command) -> Result<(), RunnerError> {
    cmd.stdout(Stdio::inherit());
    log_command_execution(&cmd);
    let status = cmd.status().map_err(|source| RunnerError::ToolSpawn {
        tool,
        program: program_of(&cmd),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::ToolFailed {
            tool,
            program: program_of(&cmd),
            status,
        })
    }
}

/// Run `cmd` to completion and return its standard output.
///
/// # Errors
///
/// As [`run_status`], plus [`RunnerError::ToolOutput`] when stdout is not
/// UTF-8.
pub(super) fn run_capture(tool: Tool, mut cmd: Command) -> Result<String, RunnerError> {
    cmd.stdout(Stdio::piped());
    log_command_execution(&cmd);
    let output = cmd.output().map_err(|source| RunnerError::ToolSpawn {
        tool,
        program: program_of(&cmd),
        source,
    })?;
    if !output.status.success() {
        return Err(RunnerError::ToolFailed {
            tool,
            program: program_of(&cmd),
            status: output.status,
        });
    }
    let text = String::from_utf8(output.stdout).map_err(|_| RunnerError::ToolOutput { tool })?;
    debug!(%tool, bytes = text.len(), "captured tool output");
    Ok(text)
}
