//! Load structure recovered from a trace.
//!
//! The trace is flat; nesting is implied by indentation. This module rebuilds
//! the nesting as an owned forest of [`LoadNode`]s and flattens it into a
//! [`LinearOrder`] in which every module follows everything it loaded.
//!
//! # Examples
//!
//! ```
//! use gosh_freeze::ir::LoadPlan;
//! use gosh_freeze::trace::parse_trace;
//!
//! let trace = concat!(
//!     ";;Loading a.scm...\n",
//!     ";; Loading b.scm...\n",
//!     ";; Loading c.scm...\n",
//!     ";;Loading d.scm...\n",
//!     ";;Dynamically Loading /x/y.so...\n",
//! );
//! let plan = LoadPlan::from_events(&parse_trace(trace)?);
//! let order: Vec<&str> = plan.order.iter().map(|p| p.as_str()).collect();
//! assert_eq!(order, ["b.scm", "c.scm", "a.scm", "d.scm"]);
//! assert_eq!(plan.extensions.len(), 1);
//! # Ok::<(), gosh_freeze::trace::TraceError>(())
//! ```

mod forest;
mod linearize;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::trace::LoadEvent;

pub use forest::{ModuleLevel, build_forest};
pub use linearize::linearize;

/// A module together with the modules loaded while it was loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadNode {
    /// Path of the module file.
    pub path: Utf8PathBuf,
    /// Nested loads, in trace order.
    pub children: Vec<LoadNode>,
}

impl LoadNode {
    /// A node with no nested loads.
    #[must_use]
    pub const fn leaf(path: Utf8PathBuf) -> Self {
        Self {
            path,
            children: Vec::new(),
        }
    }
}

/// Ordered top-level loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LoadForest(pub Vec<LoadNode>);

impl LoadForest {
    /// Root nodes in trace order.
    #[must_use]
    pub fn roots(&self) -> &[LoadNode] {
        &self.0
    }

    /// Whether the trace contained no module loads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Module paths in dependency-safe evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinearOrder(Vec<Utf8PathBuf>);

impl LinearOrder {
    /// Wrap an already ordered list.
    #[must_use]
    pub const fn new(paths: Vec<Utf8PathBuf>) -> Self {
        Self(paths)
    }

    /// Iterate over the modules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        self.0.iter().map(Utf8PathBuf::as_path)
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there is nothing to embed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the first occurrence of `path`.
    #[must_use]
    pub fn position(&self, path: &Utf8Path) -> Option<usize> {
        self.0.iter().position(|p| p == path)
    }
}

/// Native extensions in discovery order. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NativeExtensionSet(Vec<Utf8PathBuf>);

impl NativeExtensionSet {
    /// Wrap a list of extension paths.
    #[must_use]
    pub const fn new(paths: Vec<Utf8PathBuf>) -> Self {
        Self(paths)
    }

    /// Iterate over the extensions in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        self.0.iter().map(Utf8PathBuf::as_path)
    }

    /// Borrow the paths.
    #[must_use]
    pub fn as_slice(&self) -> &[Utf8PathBuf] {
        &self.0
    }

    /// Number of recorded extensions, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no extension was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the generator needs: what to embed and what to preload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadPlan {
    /// Source modules, dependencies first.
    pub order: LinearOrder,
    /// Native extensions to preload into the static image.
    pub extensions: NativeExtensionSet,
}

impl LoadPlan {
    /// Split a parsed trace into its module forest and extension list, then
    /// linearize the forest.
    #[must_use]
    pub fn from_events(events: &[LoadEvent]) -> Self {
        let forest = Self::forest_from_events(events);
        let extensions = events
            .iter()
            .filter_map(|event| match event {
                LoadEvent::NativeExtension { path } => Some(path.clone()),
                LoadEvent::TextModule { .. } => None,
            })
            .collect();
        Self {
            order: linearize(&forest),
            extensions: NativeExtensionSet::new(extensions),
        }
    }

    /// Rebuild the module nesting recorded in `events`.
    #[must_use]
    pub fn forest_from_events(events: &[LoadEvent]) -> LoadForest {
        let levels: Vec<ModuleLevel<'_>> = events
            .iter()
            .filter_map(|event| match event {
                LoadEvent::TextModule { depth, path } => Some(ModuleLevel::new(*depth, path)),
                LoadEvent::NativeExtension { .. } => None,
            })
            .collect();
        build_forest(&levels)
    }
}
