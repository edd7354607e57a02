//! Shared library discovery for the static image.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;

use crate::ir::NativeExtensionSet;

/// Extract resolved library paths from `ldd` output.
///
/// Only `name => /absolute/path (address)` lines contribute. The vDSO, the
/// dynamic loader line and `not found` entries are skipped.
///
/// # Examples
///
/// ```
/// use gosh_freeze::runner::parse_ldd_output;
///
/// let out = "\tlinux-vdso.so.1 (0x00007ffd)\n\tlibgauche-0.98.so.0 => /usr/lib/libgauche-0.98.so.0 (0x00007f10)\n";
/// let libs = parse_ldd_output(out);
/// assert_eq!(libs, ["/usr/lib/libgauche-0.98.so.0"]);
/// ```
#[must_use]
pub fn parse_ldd_output(output: &str) -> Vec<Utf8PathBuf> {
    output.lines().filter_map(library_path).collect()
}

fn library_path(line: &str) -> Option<Utf8PathBuf> {
    let (_, target) = line.split_once("=>")?;
    let path = target
        .trim()
        .split_once(" (")
        .map_or_else(|| target.trim(), |(path, _)| path.trim());
    path.starts_with('/').then(|| Utf8PathBuf::from(path))
}

/// Libraries to preload into the static image: link dependencies first,
/// then native extensions, each path once.
#[must_use]
pub fn preload_set(libraries: &[Utf8PathBuf], extensions: &NativeExtensionSet) -> IndexSet<Utf8PathBuf> {
    libraries
        .iter()
        .map(Utf8PathBuf::as_path)
        .chain(extensions.iter())
        .map(Utf8Path::to_path_buf)
        .collect()
}

/// The `LD_PRELOAD` value handed to the static-image tool.
#[must_use]
pub fn preload_value(set: &IndexSet<Utf8PathBuf>) -> String {
    itertools::join(set, " ")
}
