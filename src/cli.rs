//! Command line interface definition using clap.
//!
//! This file is also compiled by `build.rs` to render the manual page, so it
//! must not depend on anything else in the crate.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{CommandFactory, Parser};

/// Exit status for command line usage errors (`EX_USAGE`).
pub const EX_USAGE: u8 = 64;

/// Freeze a Gauche script and every module it loads into one static executable.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "gosh-freeze", version, about, long_about = None, disable_help_flag = true)]
pub struct Cli {
    /// Write the executable to FILE instead of the script name without its extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Interpreter used to trace the script and whose libraries are bundled.
    #[arg(long, value_name = "PATH")]
    pub gosh: Option<Utf8PathBuf>,

    /// Keep a copy of the generated C program at FILE.
    #[arg(long = "emit-c", value_name = "FILE")]
    pub emit_c: Option<Utf8PathBuf>,

    /// Print the modules and native extensions the script loads, then stop.
    #[arg(long)]
    pub list: bool,

    /// With --list, print the load plan as JSON.
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print usage and exit.
    #[arg(short, long)]
    pub help: bool,

    /// The script to freeze.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<Utf8PathBuf>,
}

impl Cli {
    /// Whether the invocation should only print usage.
    #[must_use]
    pub const fn wants_usage(&self) -> bool {
        self.help || self.script.is_none()
    }

    /// Where the executable for `script` goes.
    ///
    /// Without `--output` this is the script path minus its extension, or
    /// with `.bin` appended when the script has no extension.
    #[must_use]
    pub fn output_path(&self, script: &Utf8Path) -> Utf8PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stripped = script.with_extension("");
        if stripped == script {
            Utf8PathBuf::from(format!("{script}.bin"))
        } else {
            stripped
        }
    }

    /// Rendered usage text.
    #[must_use]
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello.scm", "hello")]
    #[case("dir/tool.v2.scm", "dir/tool.v2")]
    #[case("hello", "hello.bin")]
    fn default_output_strips_extension(#[case] script: &str, #[case] expected: &str) {
        let cli = Cli::default();
        assert_eq!(cli.output_path(Utf8Path::new(script)), expected);
    }

    #[test]
    fn explicit_output_wins() {
        let cli = Cli::parse_from(["gosh-freeze", "-o", "out/app", "hello.scm"]);
        assert_eq!(cli.output_path(Utf8Path::new("hello.scm")), "out/app");
    }

    #[rstest]
    #[case(&["gosh-freeze"], true)]
    #[case(&["gosh-freeze", "-h", "x.scm"], true)]
    #[case(&["gosh-freeze", "x.scm"], false)]
    fn usage_is_requested_without_script_or_with_help(
        #[case] args: &[&str],
        #[case] expected: bool,
    ) {
        let cli = Cli::try_parse_from(args).expect("parse");
        assert_eq!(cli.wants_usage(), expected);
    }

    #[test]
    fn json_requires_list() {
        assert!(Cli::try_parse_from(["gosh-freeze", "--json", "x.scm"]).is_err());
        assert!(Cli::try_parse_from(["gosh-freeze", "--list", "--json", "x.scm"]).is_ok());
    }

    #[test]
    fn usage_names_the_command() {
        assert!(Cli::usage().contains("gosh-freeze"));
    }
}
