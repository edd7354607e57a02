//! File resolution model shared by the generated program and the runner.
//!
//! [`resolve`] describes how the frozen executable answers file lookups:
//! requests that name a bundled native extension succeed without touching the
//! filesystem, and every other request follows the interpreter's usual search.
//! The runner uses the same function, with an empty extension table, to find
//! the interpreter on `PATH`.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::ir::NativeExtensionSet;

/// Filesystem check used while searching.
pub trait FileProbe {
    /// Whether `path` names an existing regular file.
    fn is_file(&self, path: &Utf8Path) -> bool;
}

/// Probe backed by the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FileProbe for HostFs {
    fn is_file(&self, path: &Utf8Path) -> bool {
        fs::metadata(path.as_std_path()).is_ok_and(|meta| meta.is_file())
    }
}

/// What to do when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Report [`ResolveError::NotFound`].
    Error,
    /// Return `Ok(None)`.
    Quiet,
}

/// Search parameters for one lookup.
#[derive(Debug, Clone, Copy)]
pub struct SearchSpec<'a> {
    /// Directories tried in order for relative requests.
    pub search_paths: &'a [Utf8PathBuf],
    /// Suffixes tried after the bare name, in order.
    pub suffixes: &'a [String],
    /// Home directory used to expand `~` and `~/...`.
    ///
    /// Another user's home (`~user/...`) is not expanded here and is probed
    /// as written. The generated program hands every `~` request to the
    /// runtime's pathname normalizer, which also resolves `~user`.
    pub home: Option<&'a Utf8Path>,
}

/// Lookup failures.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// No candidate exists.
    #[error("cannot find {request:?} in {}", display_dirs(.searched))]
    #[diagnostic(code(gosh_freeze::resolve::not_found))]
    NotFound {
        /// The path as requested.
        request: String,
        /// Directories that were searched; empty for direct paths.
        searched: Vec<Utf8PathBuf>,
    },
}

fn display_dirs(dirs: &[Utf8PathBuf]) -> String {
    if dirs.is_empty() {
        return "(no search path)".to_owned();
    }
    format!("({})", itertools::join(dirs, " "))
}

/// Native extensions the frozen executable treats as always present.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionTable<'a> {
    entries: &'a [Utf8PathBuf],
}

impl<'a> ExtensionTable<'a> {
    /// A table with no entries; every lookup falls through to the search.
    #[must_use]
    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    /// Borrow the extensions recorded in a load plan.
    #[must_use]
    pub fn from_set(set: &'a NativeExtensionSet) -> Self {
        Self {
            entries: set.as_slice(),
        }
    }

    /// Find the entry a request refers to.
    ///
    /// A request matches an entry when the entry equals the request, the
    /// request plus one of `suffixes`, or (for relative requests) ends with
    /// `/` followed by either of those.
    #[must_use]
    pub fn lookup(&self, request: &str, suffixes: &[String]) -> Option<&'a Utf8Path> {
        let relative = !is_direct(request);
        let candidates: Vec<String> = std::iter::once(request.to_owned())
            .chain(suffixes.iter().map(|suffix| format!("{request}{suffix}")))
            .collect();
        self.entries
            .iter()
            .find(|entry| {
                candidates.iter().any(|candidate| {
                    entry.as_str() == candidate
                        || (relative
                            && entry
                                .as_str()
                                .strip_suffix(candidate.as_str())
                                .is_some_and(|head| head.ends_with('/')))
                })
            })
            .map(Utf8PathBuf::as_path)
    }
}

/// Whether `request` bypasses the search path: absolute, home-relative, or
/// explicitly relative to `.` or `..`.
#[must_use]
pub fn is_direct(request: &str) -> bool {
    request.starts_with('/')
        || request.starts_with('~')
        || request.starts_with("./")
        || request.starts_with("../")
}

/// Resolve `request` the way the frozen executable does.
///
/// Table hits return immediately without calling `probe`. Other requests are
/// searched: direct paths are tried as given (after `~` expansion), relative
/// ones under each search directory in order. Each location is tried bare,
/// then with each suffix.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] on a miss when `miss` is
/// [`MissPolicy::Error`].
pub fn resolve<P: FileProbe + ?Sized>(
    request: &str,
    spec: &SearchSpec<'_>,
    table: &ExtensionTable<'_>,
    probe: &P,
    miss: MissPolicy,
) -> Result<Option<Utf8PathBuf>, ResolveError> {
    if let Some(hit) = table.lookup(request, spec.suffixes) {
        debug!(request, extension = %hit, "resolved from bundled extension table");
        return Ok(Some(hit.to_path_buf()));
    }

    if is_direct(request) {
        let base = expand_home(request, spec.home);
        if let Some(found) = try_suffixes(&base, spec.suffixes, probe) {
            return Ok(Some(found));
        }
        return not_found(request, &[], miss);
    }

    for dir in spec.search_paths {
        let base = dir.join(request);
        if let Some(found) = try_suffixes(&base, spec.suffixes, probe) {
            return Ok(Some(found));
        }
    }
    not_found(request, spec.search_paths, miss)
}

fn expand_home(request: &str, home: Option<&Utf8Path>) -> Utf8PathBuf {
    let Some(home_dir) = home else {
        return Utf8PathBuf::from(request);
    };
    if request == "~" {
        return home_dir.to_path_buf();
    }
    request
        .strip_prefix("~/")
        .map_or_else(|| Utf8PathBuf::from(request), |rest| home_dir.join(rest))
}

fn try_suffixes<P: FileProbe + ?Sized>(
    base: &Utf8Path,
    suffixes: &[String],
    probe: &P,
) -> Option<Utf8PathBuf> {
    if probe.is_file(base) {
        return Some(base.to_path_buf());
    }
    suffixes
        .iter()
        .map(|suffix| Utf8PathBuf::from(format!("{base}{suffix}")))
        .find(|candidate| probe.is_file(candidate))
}

fn not_found(
    request: &str,
    searched: &[Utf8PathBuf],
    miss: MissPolicy,
) -> Result<Option<Utf8PathBuf>, ResolveError> {
    match miss {
        MissPolicy::Quiet => Ok(None),
        MissPolicy::Error => Err(ResolveError::NotFound {
            request: request.to_owned(),
            searched: searched.to_vec(),
        }),
    }
}
