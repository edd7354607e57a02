//! On-disk Scheme module fixtures and matching load traces.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory of module files.
#[derive(Debug)]
pub struct ModuleTree {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ModuleTree {
    /// Create an empty tree.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("module dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        Self { _dir: dir, root }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `text` to `name` under the root, creating parents, and return
    /// the absolute path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, name: &str, text: impl AsRef<[u8]>) -> Utf8PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("module parent dir");
        }
        fs::write(&path, text).expect("write module");
        path
    }
}

impl Default for ModuleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A trace line reporting a source module load at `depth`.
#[must_use]
pub fn module_line(depth: usize, path: &Utf8Path) -> String {
    format!(";;{}Loading {path}...\n", " ".repeat(depth))
}

/// A trace line reporting a native extension load.
#[must_use]
pub fn extension_line(path: &Utf8Path) -> String {
    format!(";;Dynamically Loading {path}...\n")
}
