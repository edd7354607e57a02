//! CLI execution and pipeline orchestration.
//!
//! [`run`] traces the script, turns the trace into a [`LoadPlan`], generates
//! the C program and drives the compiler, `ldd` and `statifier` to produce
//! the static executable. Stages run strictly one after another; a pending
//! termination signal is noticed at the next stage boundary.

mod artifacts;
mod error;
mod link_deps;
mod process;
mod toolchain;

use std::env;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{Level, debug, info};

use crate::c_gen::{self, ProgramSource};
use crate::cli::Cli;
use crate::interrupt;
use crate::ir::LoadPlan;
use crate::resolve::HostFs;
use crate::trace::{TraceCommand, capture_trace, parse_trace};

pub use artifacts::{BINARY_NAME, IMAGE_NAME, SOURCE_NAME, Scratch, write_program_copy};
pub use error::{RunnerError, diagnostic_help};
pub use link_deps::{parse_ldd_output, preload_set, preload_value};
pub use toolchain::{Tool, Toolchain};

/// `gauche-config` queries whose output is forwarded to the compiler.
const GAUCHE_CONFIG_QUERIES: [&str; 3] = ["-I", "-L", "-l"];

/// Execute the parsed [`Cli`] using tools from the process environment.
///
/// # Errors
///
/// Returns an error if any stage of the pipeline fails.
pub fn run(cli: &Cli) -> Result<()> {
    let tools = Toolchain::from_env(cli.gosh.as_deref());
    run_with(cli, &tools, interrupt::flag())
}

/// Execute the parsed [`Cli`] with an explicit toolchain and interrupt flag.
///
/// # Errors
///
/// Returns an error if any stage of the pipeline fails or `interrupted` is
/// set when a stage boundary is reached.
pub fn run_with(cli: &Cli, tools: &Toolchain, interrupted: &AtomicBool) -> Result<()> {
    let script = cli.script.as_deref().ok_or(RunnerError::MissingScript)?;
    let plan = analyse(script, tools, interrupted)?;
    if cli.list {
        return print_plan(&plan, cli.json);
    }

    checkpoint(interrupted, "program generation")?;
    let program = c_gen::generate_from_plan(&plan.order, &plan.extensions)
        .context("generating the frozen program")?;
    if let Some(path) = &cli.emit_c {
        write_program_copy(path, &program)?;
    }
    let output = cli.output_path(script);
    freeze(&program, &plan, tools, &output, interrupted)
        .with_context(|| format!("building {output}"))
}

/// Trace `script` and derive its load plan.
fn analyse(script: &Utf8Path, tools: &Toolchain, interrupted: &AtomicBool) -> Result<LoadPlan> {
    let trace = TraceCommand::new(tools.program(Tool::Gosh), script);
    let text = capture_trace(&trace).with_context(|| format!("tracing {script}"))?;
    checkpoint(interrupted, "trace parsing")?;
    let events = parse_trace(&text).with_context(|| format!("parsing the load trace of {script}"))?;
    if tracing::enabled!(Level::DEBUG) {
        let forest = LoadPlan::forest_from_events(&events);
        match serde_json::to_string_pretty(&forest) {
            Ok(json) => debug!("load forest:\n{json}"),
            Err(err) => debug!("load forest not serializable: {err}"),
        }
    }
    let plan = LoadPlan::from_events(&events);
    info!(
        modules = plan.order.len(),
        extensions = plan.extensions.len(),
        "load plan ready"
    );
    Ok(plan)
}

fn print_plan(plan: &LoadPlan, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, plan).context("writing the load plan")?;
        writeln!(out)?;
    } else {
        for module in plan.order.iter() {
            writeln!(out, "module {module}")?;
        }
        for extension in plan.extensions.iter() {
            writeln!(out, "extension {extension}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Compile, statify and publish. The scratch directory is removed when this
/// returns, whatever the outcome.
fn freeze(
    program: &ProgramSource,
    plan: &LoadPlan,
    tools: &Toolchain,
    output: &Utf8Path,
    interrupted: &AtomicBool,
) -> Result<()> {
    let scratch = Scratch::create()?;
    let source = scratch.write_source(program)?;

    checkpoint(interrupted, "compilation")?;
    let flags = compiler_flags(tools)?;
    let mut cc = process::command(tools.program(Tool::Cc));
    cc.arg("-rdynamic")
        .arg("-o")
        .arg(scratch.binary_path().as_std_path())
        .arg(source.as_std_path())
        .args(&flags);
    process::run_status(Tool::Cc, cc)?;

    checkpoint(interrupted, "link dependency scan")?;
    let runtime = tools
        .runtime_binary(env::var_os("PATH").as_ref(), &HostFs)
        .context("locating the interpreter binary")?;
    let mut ldd = process::command(tools.program(Tool::Ldd));
    ldd.arg(runtime.as_std_path());
    let libraries = parse_ldd_output(&process::run_capture(Tool::Ldd, ldd)?);
    let preload = preload_set(&libraries, &plan.extensions);
    debug!(count = preload.len(), "preload set assembled");

    checkpoint(interrupted, "static image creation")?;
    let mut statifier = process::command(tools.program(Tool::Statifier));
    statifier
        .arg(format!("--set=LD_PRELOAD={}", preload_value(&preload)))
        .arg("--set=LD_BIND_NOW=1")
        .arg(scratch.binary_path().as_std_path())
        .arg(scratch.image_path().as_std_path());
    process::run_status(Tool::Statifier, statifier)?;

    checkpoint(interrupted, "publishing the executable")?;
    scratch.publish(output)
}

fn compiler_flags(tools: &Toolchain) -> Result<Vec<String>, RunnerError> {
    let mut flags = Vec::new();
    for query in GAUCHE_CONFIG_QUERIES {
        let mut cmd = process::command(tools.program(Tool::GaucheConfig));
        cmd.arg(query);
        let output = process::run_capture(Tool::GaucheConfig, cmd)?;
        let words = shlex::split(output.trim()).ok_or_else(|| RunnerError::UnsplittableFlags {
            tool: Tool::GaucheConfig,
            output: output.clone(),
        })?;
        flags.extend(words);
    }
    Ok(flags)
}

fn checkpoint(interrupted: &AtomicBool, stage: &'static str) -> Result<(), RunnerError> {
    if interrupted.load(Ordering::SeqCst) {
        Err(RunnerError::Interrupted { stage })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_passes_until_flag_is_set() {
        let flag = AtomicBool::new(false);
        assert!(checkpoint(&flag, "x").is_ok());
        flag.store(true, Ordering::SeqCst);
        let err = checkpoint(&flag, "compilation").expect_err("interrupted");
        assert_eq!(err.to_string(), "interrupted before compilation");
    }

    #[test]
    fn missing_script_is_reported() {
        let tools = Toolchain::resolve_with(None, |_| None);
        let err = run_with(&Cli::default(), &tools, &AtomicBool::new(false))
            .expect_err("no script");
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::MissingScript)
        ));
    }
}
