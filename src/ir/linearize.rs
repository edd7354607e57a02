//! Flatten a load forest into evaluation order.

use camino::Utf8PathBuf;

use super::{LinearOrder, LoadForest, LoadNode};

/// Emit each node after all of its descendants, keeping sibling order.
///
/// Evaluating the result front to back never evaluates a module before the
/// modules it loaded.
#[must_use]
pub fn linearize(forest: &LoadForest) -> LinearOrder {
    let mut out = Vec::new();
    for root in forest.roots() {
        push_post_order(root, &mut out);
    }
    LinearOrder::new(out)
}

fn push_post_order(node: &LoadNode, out: &mut Vec<Utf8PathBuf>) {
    for child in &node.children {
        push_post_order(child, out);
    }
    out.push(node.path.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ModuleLevel, build_forest};
    use camino::Utf8Path;
    use rstest::rstest;

    fn order_of(pairs: &[(usize, &str)]) -> Vec<String> {
        let levels: Vec<_> = pairs
            .iter()
            .map(|(depth, path)| ModuleLevel::new(*depth, Utf8Path::new(path)))
            .collect();
        linearize(&build_forest(&levels))
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(&[(0, "a")], &["a"])]
    #[case(&[(0, "a"), (1, "b"), (1, "c"), (0, "d")], &["b", "c", "a", "d"])]
    #[case(&[(0, "a"), (1, "b"), (2, "c"), (1, "d")], &["c", "b", "d", "a"])]
    fn children_precede_parents(#[case] pairs: &[(usize, &str)], #[case] expected: &[&str]) {
        assert_eq!(order_of(pairs), expected);
    }

    fn check_subtree(node: &LoadNode, order: &LinearOrder) {
        let own = order.position(&node.path).expect("node present");
        for child in &node.children {
            let pos = order.position(&child.path).expect("child present");
            assert!(pos < own, "{} must precede {}", child.path, node.path);
            check_subtree(child, order);
        }
    }

    #[test]
    fn every_descendant_precedes_its_ancestor() {
        let pairs = [
            (0, "r1"),
            (1, "a"),
            (2, "a1"),
            (3, "a11"),
            (2, "a2"),
            (1, "b"),
            (0, "r2"),
            (1, "c"),
            (2, "c1"),
            (0, "r3"),
        ];
        let levels: Vec<_> = pairs
            .iter()
            .map(|(depth, path)| ModuleLevel::new(*depth, Utf8Path::new(path)))
            .collect();
        let forest = build_forest(&levels);
        let order = linearize(&forest);
        assert_eq!(order.len(), pairs.len());
        for root in forest.roots() {
            check_subtree(root, &order);
        }
    }
}
