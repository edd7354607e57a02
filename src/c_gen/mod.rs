//! C program generator.
//!
//! Turns a [`LinearOrder`] of module files and a [`NativeExtensionSet`] into
//! the source of a program that evaluates the embedded modules in order and
//! then calls the script's `main`. The output is deterministic for a given
//! plan and module contents.

mod escape;
mod runtime;

use std::fmt::{self, Display, Formatter, Write};
use std::{fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::ir::{LinearOrder, NativeExtensionSet};

pub use escape::{CLiteral, escape_c_bytes};

/// Errors raised while generating the program.
#[derive(Debug, Error, Diagnostic)]
pub enum GenError {
    /// A module listed in the load order could not be read.
    #[error("failed to read module {path}")]
    #[diagnostic(
        code(gosh_freeze::c_gen::read_module),
        help("the module was loaded during tracing; check it still exists and is readable")
    )]
    ReadModule {
        /// Module path from the trace.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Formatting the program text failed.
    #[error("failed to format generated program")]
    #[diagnostic(code(gosh_freeze::c_gen::format))]
    Format(#[from] fmt::Error),
}

/// A module's path and its exact on-disk bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedModule {
    /// Path as recorded in the trace.
    pub path: Utf8PathBuf,
    /// File contents, unmodified.
    pub text: Vec<u8>,
}

/// Generated C source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource(String);

impl ProgramSource {
    /// Wrap program text produced elsewhere.
    #[must_use]
    pub const fn new(text: String) -> Self {
        Self(text)
    }

    /// Borrow the program text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ProgramSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Read every module in `order`.
///
/// # Errors
///
/// Returns [`GenError::ReadModule`] for the first module that cannot be read.
pub fn load_modules(order: &LinearOrder) -> Result<Vec<EmbeddedModule>, GenError> {
    order.iter().map(read_module).collect()
}

fn read_module(path: &Utf8Path) -> Result<EmbeddedModule, GenError> {
    let text = fs::read(path.as_std_path()).map_err(|source| GenError::ReadModule {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(module = %path, bytes = text.len(), "embedded module");
    Ok(EmbeddedModule {
        path: path.to_path_buf(),
        text,
    })
}

/// Read the modules in `order` and generate the program.
///
/// # Errors
///
/// Returns [`GenError`] if a module cannot be read.
pub fn generate_from_plan(
    order: &LinearOrder,
    extensions: &NativeExtensionSet,
) -> Result<ProgramSource, GenError> {
    let modules = load_modules(order)?;
    generate(&modules, extensions)
}

/// Generate the program for already-read modules.
///
/// # Errors
///
/// Returns [`GenError::Format`] if writing to the output buffer fails.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use gosh_freeze::c_gen::{EmbeddedModule, generate};
/// use gosh_freeze::ir::NativeExtensionSet;
///
/// let module = EmbeddedModule {
///     path: Utf8PathBuf::from("/lib/a.scm"),
///     text: b"(define x 1)\n".to_vec(),
/// };
/// let program = generate(&[module], &NativeExtensionSet::default())?;
/// assert!(program.as_str().contains("\"(define x 1)\\n\""));
/// assert!(program.as_str().contains("int main(int argc, char **argv)"));
/// # Ok::<(), gosh_freeze::c_gen::GenError>(())
/// ```
pub fn generate(
    modules: &[EmbeddedModule],
    extensions: &NativeExtensionSet,
) -> Result<ProgramSource, GenError> {
    let mut out = String::new();
    out.push_str(runtime::PRELUDE);
    write!(out, "{}", ExtensionTable(extensions))?;
    out.push_str(runtime::FIND_FILE);
    for (idx, module) in modules.iter().enumerate() {
        write!(out, "{}", ModuleText { idx, module })?;
    }
    out.push_str(runtime::LOAD_ONE);
    write!(out, "{}", LoadSequence(modules))?;
    out.push_str(runtime::MAIN);
    Ok(ProgramSource(out))
}

struct ExtensionTable<'a>(&'a NativeExtensionSet);

impl Display for ExtensionTable<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "static const char *const frozen_extensions[] = {{")?;
        for ext in self.0.iter() {
            writeln!(f, "    \"{}\",", escape_c_bytes(ext.as_str().as_bytes()))?;
        }
        writeln!(f, "    NULL")?;
        writeln!(f, "}};")
    }
}

struct ModuleText<'a> {
    idx: usize,
    module: &'a EmbeddedModule,
}

impl Display for ModuleText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "/* {} */", CommentSafe(&self.module.path))?;
        writeln!(
            f,
            "static const char frozen_module_{}[] =\n    {};",
            self.idx,
            CLiteral::new(&self.module.text, "    ")
        )
    }
}

struct LoadSequence<'a>(&'a [EmbeddedModule]);

impl Display for LoadSequence<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "static int frozen_load_modules(void)")?;
        writeln!(f, "{{")?;
        for (idx, module) in self.0.iter().enumerate() {
            writeln!(
                f,
                "    if (frozen_load(\"{name}\", frozen_module_{idx}, sizeof(frozen_module_{idx}) - 1) < 0) return -1;",
                name = escape_c_bytes(module.path.as_str().as_bytes()),
            )?;
        }
        writeln!(f, "    return 0;")?;
        writeln!(f, "}}")
    }
}

/// Path text that cannot terminate a C block comment.
struct CommentSafe<'a>(&'a Utf8Path);

impl Display for CommentSafe<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.as_str().replace("*/", "*\\/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, text: &str) -> EmbeddedModule {
        EmbeddedModule {
            path: Utf8PathBuf::from(path),
            text: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn modules_load_in_given_order() {
        let modules = [module("/m/b.scm", "b"), module("/m/a.scm", "a")];
        let program = generate(&modules, &NativeExtensionSet::default()).expect("generate");
        let text = program.as_str();
        let b = text.find("frozen_load(\"/m/b.scm\"").expect("b loaded");
        let a = text.find("frozen_load(\"/m/a.scm\"").expect("a loaded");
        assert!(b < a);
        assert!(text.contains("frozen_module_0, sizeof(frozen_module_0) - 1"));
    }

    #[test]
    fn extension_table_is_null_terminated() {
        let set = NativeExtensionSet::new(vec![Utf8PathBuf::from("/x/y.so")]);
        let program = generate(&[], &set).expect("generate");
        assert!(
            program
                .as_str()
                .contains("frozen_extensions[] = {\n    \"/x/y.so\",\n    NULL\n};")
        );
    }

    #[test]
    fn definitions_precede_their_uses() {
        let program = generate(&[module("a.scm", "")], &NativeExtensionSet::default())
            .expect("generate");
        let text = program.as_str();
        let pos = |needle: &str| text.find(needle).expect(needle);
        assert!(pos("frozen_extensions[]") < pos("ScmObj Scm_FindFile("));
        assert!(pos("static int frozen_load(") < pos("static int frozen_load_modules("));
        assert!(pos("static int frozen_load_modules(") < pos("int main("));
    }

    #[test]
    fn comment_cannot_be_closed_by_path() {
        let program = generate(&[module("/odd*/name.scm", "")], &NativeExtensionSet::default())
            .expect("generate");
        assert!(program.as_str().contains("/* /odd*\\/name.scm */"));
    }

    #[test]
    fn missing_module_is_reported() {
        let order = LinearOrder::new(vec![Utf8PathBuf::from("/definitely/not/here.scm")]);
        let err = load_modules(&order).expect_err("missing file");
        assert!(matches!(err, GenError::ReadModule { ref path, .. } if path == "/definitely/not/here.scm"));
    }
}
