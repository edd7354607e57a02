//! Rebuild load nesting from indentation depth.

use std::cmp::Ordering;
use std::iter::Peekable;

use camino::Utf8Path;

use super::{LoadForest, LoadNode};

/// A module load stripped down to what the tree builder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleLevel<'a> {
    /// Indentation depth reported by the trace.
    pub depth: usize,
    /// Module path.
    pub path: &'a Utf8Path,
}

impl<'a> ModuleLevel<'a> {
    /// Pair a depth with a module path.
    #[must_use]
    pub const fn new(depth: usize, path: &'a Utf8Path) -> Self {
        Self { depth, path }
    }
}

/// Build the ordered forest implied by a depth-annotated load sequence.
///
/// An entry at the current depth starts a new sibling. A deeper entry opens
/// a subtree under the most recent sibling that lasts until the depth falls
/// back. A shallower entry ends the current level.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use gosh_freeze::ir::{ModuleLevel, build_forest};
///
/// let levels = [
///     ModuleLevel::new(0, Utf8Path::new("a")),
///     ModuleLevel::new(1, Utf8Path::new("b")),
///     ModuleLevel::new(0, Utf8Path::new("c")),
/// ];
/// let forest = build_forest(&levels);
/// assert_eq!(forest.roots().len(), 2);
/// assert_eq!(forest.roots()[0].children[0].path, "b");
/// ```
#[must_use]
pub fn build_forest(levels: &[ModuleLevel<'_>]) -> LoadForest {
    let mut cursor = levels.iter().copied().peekable();
    let base = levels.first().map_or(0, |level| level.depth);
    let mut roots = descend(&mut cursor, base);
    // A trace that starts deeper than it later returns to leaves the
    // shallower tail for an outer level that never ran.
    while cursor.peek().is_some() {
        let next_base = cursor.peek().map_or(0, |level| level.depth);
        roots.extend(descend(&mut cursor, next_base));
    }
    LoadForest(roots)
}

fn descend<'a, I>(cursor: &mut Peekable<I>, level: usize) -> Vec<LoadNode>
where
    I: Iterator<Item = ModuleLevel<'a>>,
{
    let mut siblings: Vec<LoadNode> = Vec::new();
    while let Some(next) = cursor.peek().copied() {
        match next.depth.cmp(&level) {
            Ordering::Less => break,
            Ordering::Equal => {
                cursor.next();
                siblings.push(LoadNode::leaf(next.path.to_path_buf()));
            }
            Ordering::Greater => {
                let nested = descend(cursor, next.depth);
                match siblings.last_mut() {
                    Some(parent) => parent.children.extend(nested),
                    None => siblings.extend(nested),
                }
            }
        }
    }
    siblings
}
