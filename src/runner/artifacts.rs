//! Scratch directory and output file handling.
//!
//! Everything the pipeline writes lives in a per-invocation temporary
//! directory until the static image is complete. Dropping [`Scratch`]
//! removes the directory, so failures and interrupts leave nothing behind.

use std::io;

use anyhow::{Context, Result as AnyResult, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tempfile::{Builder, TempDir};
use tracing::{debug, info};

use super::error::RunnerError;
use crate::c_gen::ProgramSource;

/// File name of the generated program inside the scratch directory.
pub const SOURCE_NAME: &str = "frozen.c";
/// File name of the intermediate dynamically linked executable.
pub const BINARY_NAME: &str = "frozen.bin";
/// File name of the static image before it is moved to the output path.
pub const IMAGE_NAME: &str = "frozen.static";

/// Per-invocation working directory.
#[derive(Debug)]
pub struct Scratch {
    // Field order matters: the handle closes before the directory is removed.
    dir: Dir,
    path: Utf8PathBuf,
    _guard: TempDir,
}

impl Scratch {
    /// Create a fresh scratch directory under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or opened, or its path is not
    /// UTF-8.
    pub fn create() -> AnyResult<Self> {
        let guard = Builder::new()
            .prefix("gosh-freeze.")
            .tempdir()
            .context("failed to create scratch directory")?;
        let path = Utf8PathBuf::from_path_buf(guard.path().to_path_buf())
            .map_err(|path| RunnerError::ScratchPath { path })?;
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .with_context(|| format!("failed to open scratch directory {path}"))?;
        debug!(scratch = %path, "created scratch directory");
        Ok(Self {
            dir,
            path,
            _guard: guard,
        })
    }

    /// Absolute path of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Path of the generated C source.
    #[must_use]
    pub fn source_path(&self) -> Utf8PathBuf {
        self.path.join(SOURCE_NAME)
    }

    /// Path of the intermediate executable.
    #[must_use]
    pub fn binary_path(&self) -> Utf8PathBuf {
        self.path.join(BINARY_NAME)
    }

    /// Path the static-image tool writes to.
    #[must_use]
    pub fn image_path(&self) -> Utf8PathBuf {
        self.path.join(IMAGE_NAME)
    }

    /// Write the generated program into the scratch directory.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_source(&self, program: &ProgramSource) -> AnyResult<Utf8PathBuf> {
        self.dir
            .write(SOURCE_NAME, program.as_str())
            .with_context(|| format!("failed to write {}", self.source_path()))?;
        Ok(self.source_path())
    }

    /// Move the finished image to `output`, creating parent directories.
    ///
    /// A rename is tried first; when the output is on another filesystem the
    /// image is copied and its permissions are reapplied.
    ///
    /// # Errors
    ///
    /// Fails if the image is missing or cannot be placed at `output`.
    pub fn publish(&self, output: &Utf8Path) -> AnyResult<()> {
        let (out_dir, relative) = derive_dir_and_relative(output)?;
        ensure_parent(&out_dir, &relative)?;
        match self.dir.rename(IMAGE_NAME, &out_dir, &relative) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                debug!("image is on another filesystem; copying");
                self.copy_image(&out_dir, &relative)?;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to move image to {output}"));
            }
        }
        info!("Wrote static executable to {output}");
        Ok(())
    }

    fn copy_image(&self, out_dir: &Dir, relative: &Utf8Path) -> AnyResult<()> {
        let permissions = self
            .dir
            .metadata(IMAGE_NAME)
            .context("failed to read image metadata")?
            .permissions();
        self.dir
            .copy(IMAGE_NAME, out_dir, relative)
            .with_context(|| format!("failed to copy image to {relative}"))?;
        out_dir
            .set_permissions(relative, permissions)
            .with_context(|| format!("failed to set permissions on {relative}"))?;
        Ok(())
    }
}

/// Keep a copy of the generated program at `path`.
///
/// # Errors
///
/// Fails if the file or its parent directories cannot be written.
pub fn write_program_copy(path: &Utf8Path, program: &ProgramSource) -> AnyResult<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    ensure_parent(&dir, &relative)?;
    dir.write(&relative, program.as_str())
        .with_context(|| format!("failed to write {path}"))?;
    info!("Wrote generated program to {path}");
    Ok(())
}

fn ensure_parent(dir: &Dir, relative: &Utf8Path) -> AnyResult<()> {
    if let Some(parent) = relative.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent)
            .with_context(|| format!("failed to create directory {parent}"))?;
    }
    Ok(())
}

/// Open the nearest existing ancestor of `path` and return the rest of the
/// path relative to it. Relative paths are anchored at the current directory
/// first so that `..` components keep working.
fn derive_dir_and_relative(path: &Utf8Path) -> AnyResult<(Dir, Utf8PathBuf)> {
    let absolute = if path.is_relative() {
        let cwd = std::env::current_dir().context("failed to read the current directory")?;
        Utf8PathBuf::from_path_buf(cwd)
            .map_err(|cwd| anyhow!("current directory {} is not valid UTF-8", cwd.display()))?
            .join(path)
    } else {
        path.to_owned()
    };

    let mut ancestors = absolute.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            Dir::open_ambient_dir(candidate, ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = absolute
        .strip_prefix(&base)
        .context("failed to derive a relative output path")?
        .to_owned();
    Ok((dir, relative))
}
