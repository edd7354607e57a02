//! Run `gosh` once against the user script and collect its load report.
//!
//! The interpreter loads the script, then walks every binding visible from
//! the `user` module. Touching a binding forces any pending autoload, so
//! modules reached only through lazy bindings show up in the trace as well.

use std::process::{Command, Stdio};

use camino::Utf8Path;
use tracing::{debug, info, warn};

use super::TraceError;
use crate::resolve::is_direct;

/// Scheme form that resolves every autoload reachable from `user`.
pub const SCAN_BINDINGS_FORM: &str = concat!(
    "(let ((user (find-module 'user)))",
    " (for-each (lambda (m)",
    " (hash-table-for-each (module-table m)",
    " (lambda (name _) (global-variable-ref m name #f))))",
    " (append (module-imports user) (module-precedence-list user))))",
);

/// Arguments used to ask `gosh` for a load trace of one script.
#[derive(Debug, Clone)]
pub struct TraceCommand<'a> {
    runtime: &'a Utf8Path,
    script: &'a Utf8Path,
}

impl<'a> TraceCommand<'a> {
    /// Prepare a trace run of `script` under `runtime`.
    #[must_use]
    pub const fn new(runtime: &'a Utf8Path, script: &'a Utf8Path) -> Self {
        Self { runtime, script }
    }

    /// Command-line arguments passed to the interpreter, in order.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        vec![
            "-fload-verbose".to_owned(),
            format!("-l{}", self.load_target()),
            format!("-e{SCAN_BINDINGS_FORM}"),
            "-e(exit 0)".to_owned(),
        ]
    }

    /// The script as `load` should see it. A bare relative name would be
    /// searched for on the interpreter's load path, so it is anchored at the
    /// working directory instead.
    fn load_target(&self) -> String {
        if is_direct(self.script.as_str()) {
            self.script.to_string()
        } else {
            format!("./{}", self.script)
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.runtime.as_std_path());
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Run the interpreter and return the raw trace text from its error stream.
///
/// The interpreter's exit status is logged but does not fail the capture; the
/// trace parser rejects any stray diagnostics the interpreter printed.
///
/// # Errors
///
/// Returns [`TraceError::Spawn`] when the interpreter cannot be started and
/// [`TraceError::Encoding`] when its error stream is not UTF-8.
pub fn capture_trace(trace: &TraceCommand<'_>) -> Result<String, TraceError> {
    let mut cmd = trace.command();
    info!(
        "Running command: {} {}",
        trace.runtime,
        shlex::try_join(trace.args().iter().map(String::as_str))
            .unwrap_or_else(|_| trace.args().join(" "))
    );
    let output = cmd.output().map_err(|source| TraceError::Spawn {
        program: trace.runtime.to_path_buf(),
        source,
    })?;
    if !output.status.success() {
        warn!(
            status = %output.status,
            "{} exited unsuccessfully while tracing {}",
            trace.runtime,
            trace.script
        );
    }
    let text = String::from_utf8(output.stderr).map_err(|_| TraceError::Encoding {
        program: trace.runtime.to_path_buf(),
    })?;
    debug!(lines = text.lines().count(), "captured load trace");
    Ok(text)
}
