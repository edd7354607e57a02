//! External tool locations.
//!
//! Each tool is taken from the command line where a flag exists, then from
//! its `GOSH_FREEZE_*` environment variable, then from a bare default name
//! that the operating system looks up on `PATH`.

use std::env;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};

use camino::{Utf8Path, Utf8PathBuf};
use tool_env::{CC_ENV, GAUCHE_CONFIG_ENV, GOSH_ENV, LDD_ENV, STATIFIER_ENV};

use crate::resolve::{ExtensionTable, FileProbe, MissPolicy, ResolveError, SearchSpec, resolve};

/// The external programs the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// The Scheme interpreter, traced and later linked against.
    Gosh,
    /// Host C compiler.
    Cc,
    /// Build-flag helper shipped with the interpreter.
    GaucheConfig,
    /// Shared library dependency lister.
    Ldd,
    /// Static-image tool.
    Statifier,
}

impl Tool {
    /// Program name used when nothing overrides it.
    #[must_use]
    pub const fn default_program(self) -> &'static str {
        match self {
            Self::Gosh => "gosh",
            Self::Cc => "cc",
            Self::GaucheConfig => "gauche-config",
            Self::Ldd => "ldd",
            Self::Statifier => "statifier",
        }
    }

    /// Environment variable that overrides the program.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Gosh => GOSH_ENV,
            Self::Cc => CC_ENV,
            Self::GaucheConfig => GAUCHE_CONFIG_ENV,
            Self::Ldd => LDD_ENV,
            Self::Statifier => STATIFIER_ENV,
        }
    }
}

impl Display for Tool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_program())
    }
}

/// Resolved program for every [`Tool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    gosh: Utf8PathBuf,
    cc: Utf8PathBuf,
    gauche_config: Utf8PathBuf,
    ldd: Utf8PathBuf,
    statifier: Utf8PathBuf,
}

impl Toolchain {
    /// Resolve every tool from `gosh_flag` and the process environment.
    #[must_use]
    pub fn from_env(gosh_flag: Option<&Utf8Path>) -> Self {
        Self::resolve_with(gosh_flag, |key| env::var_os(key))
    }

    /// Resolve every tool using `read_env` in place of the process
    /// environment. Values that are not valid UTF-8 are ignored.
    #[must_use]
    pub fn resolve_with<F>(gosh_flag: Option<&Utf8Path>, mut read_env: F) -> Self
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let mut pick = |tool: Tool| {
            read_env(tool.env_var())
                .and_then(|value| value.into_string().ok())
                .filter(|value| !value.is_empty())
                .map_or_else(
                    || Utf8PathBuf::from(tool.default_program()),
                    Utf8PathBuf::from,
                )
        };
        let gosh = gosh_flag.map_or_else(|| pick(Tool::Gosh), Utf8Path::to_path_buf);
        Self {
            gosh,
            cc: pick(Tool::Cc),
            gauche_config: pick(Tool::GaucheConfig),
            ldd: pick(Tool::Ldd),
            statifier: pick(Tool::Statifier),
        }
    }

    /// Program configured for `tool`.
    #[must_use]
    pub fn program(&self, tool: Tool) -> &Utf8Path {
        match tool {
            Tool::Gosh => &self.gosh,
            Tool::Cc => &self.cc,
            Tool::GaucheConfig => &self.gauche_config,
            Tool::Ldd => &self.ldd,
            Tool::Statifier => &self.statifier,
        }
    }

    /// Locate the interpreter binary so its link dependencies can be listed.
    ///
    /// Programs containing a `/` are used as given; bare names are searched
    /// for in `path_var` the way `execvp` does, with empty entries meaning
    /// the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when no `PATH` entry holds the
    /// program.
    pub fn runtime_binary<P: FileProbe + ?Sized>(
        &self,
        path_var: Option<&OsString>,
        probe: &P,
    ) -> Result<Utf8PathBuf, ResolveError> {
        if self.gosh.as_str().contains('/') {
            return Ok(self.gosh.clone());
        }
        let dirs: Vec<Utf8PathBuf> = path_var
            .map(|value| {
                env::split_paths(value)
                    .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok())
                    .map(|dir| {
                        if dir.as_str().is_empty() {
                            Utf8PathBuf::from(".")
                        } else {
                            dir
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        let spec = SearchSpec {
            search_paths: &dirs,
            suffixes: &[],
            home: None,
        };
        resolve(
            self.gosh.as_str(),
            &spec,
            &ExtensionTable::empty(),
            probe,
            MissPolicy::Error,
        )?
        .ok_or_else(|| ResolveError::NotFound {
            request: self.gosh.to_string(),
            searched: dirs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Present(HashSet<&'static str>);

    impl FileProbe for Present {
        fn is_file(&self, path: &Utf8Path) -> bool {
            self.0.contains(path.as_str())
        }
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let tools = Toolchain::resolve_with(None, |_| None);
        assert_eq!(tools.program(Tool::Gosh), "gosh");
        assert_eq!(tools.program(Tool::Statifier), "statifier");
    }

    #[test]
    fn flag_beats_environment() {
        let tools = Toolchain::resolve_with(Some(Utf8Path::new("/opt/gosh")), |key| {
            (key == GOSH_ENV).then(|| OsString::from("/env/gosh"))
        });
        assert_eq!(tools.program(Tool::Gosh), "/opt/gosh");
    }

    #[test]
    fn environment_beats_default() {
        let tools = Toolchain::resolve_with(None, |key| {
            (key == CC_ENV).then(|| OsString::from("clang"))
        });
        assert_eq!(tools.program(Tool::Cc), "clang");
        assert_eq!(tools.program(Tool::Ldd), "ldd");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_override_is_ignored() {
        use std::os::unix::ffi::OsStringExt;

        let tools = Toolchain::resolve_with(None, |_| Some(OsString::from_vec(vec![0xff, b'x'])));
        assert_eq!(tools.program(Tool::Cc), "cc");
    }

    #[test]
    fn runtime_binary_searches_path_in_order() {
        let tools = Toolchain::resolve_with(None, |_| None);
        let probe = Present(["/b/gosh", "/c/gosh"].into_iter().collect());
        let path_var = OsString::from("/a:/b:/c");
        let found = tools.runtime_binary(Some(&path_var), &probe).expect("found");
        assert_eq!(found, "/b/gosh");
    }

    #[test]
    fn runtime_binary_reports_searched_dirs() {
        let tools = Toolchain::resolve_with(None, |_| None);
        let probe = Present(HashSet::new());
        let path_var = OsString::from("/a:/b");
        let err = tools
            .runtime_binary(Some(&path_var), &probe)
            .expect_err("missing");
        let ResolveError::NotFound { searched, .. } = err;
        assert_eq!(searched, [Utf8PathBuf::from("/a"), Utf8PathBuf::from("/b")]);
    }

    #[test]
    fn explicit_paths_skip_the_search() {
        let tools = Toolchain::resolve_with(Some(Utf8Path::new("./bin/gosh")), |_| None);
        let found = tools
            .runtime_binary(None, &Present(HashSet::new()))
            .expect("explicit");
        assert_eq!(found, "./bin/gosh");
    }
}
