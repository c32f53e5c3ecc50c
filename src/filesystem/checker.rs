//! Invariant checks for a [`FileTree`](super::FileTree) and its nodes.
//!
//! Nothing here mutates the tree. Every violation is logged at error level
//! and turns the result to `false`. A failing check means the tree's own
//! bookkeeping is broken, so callers treat it as fatal.

use std::cmp::Ordering;

use tracing::error;

use crate::filesystem::{NodeArena, NodeId};

/// Checks the parent/child relationship of a single node.
pub fn node_is_valid(arena: &NodeArena, id: Option<NodeId>) -> bool {
    let Some(id) = id else {
        error!("A node is absent");
        return false;
    };
    let Some(node) = arena.get(id) else {
        error!("Node {} does not exist in the arena", id);
        return false;
    };
    let path = node.path();
    let depth = path.depth();

    let parent = match node.parent() {
        Some(parent_id) => match arena.get(parent_id) {
            Some(parent) => Some(parent),
            None => {
                error!("Parent {} of '{}' does not exist", parent_id, path);
                return false;
            }
        },
        None => None,
    };

    if let Some(parent) = parent {
        let parent_path = parent.path();
        if path.shared_prefix_depth(parent_path) != depth - 1
            || parent_path.depth() != depth - 1
        {
            error!(
                "Parent and child do not have parent and child paths: ('{}') ('{}')",
                parent_path, path
            );
            return false;
        }
    }

    if depth == 1 {
        if parent.is_some() {
            error!("The root '{}' has a parent", path);
            return false;
        }
        if path.pathname().contains('/') {
            error!("The root '{}' contains a separator", path);
            return false;
        }
    }

    if depth > 1 && parent.is_none() {
        error!("'{}' is not the root but has no parent", path);
        return false;
    }

    if path.is_empty() {
        error!("Node {} has an empty path", id);
        return false;
    }

    let Some(parent) = parent else {
        return true;
    };
    if parent.is_file() {
        error!("The parent of '{}' is a file", path);
        return false;
    }

    let mut occurrences = 0;
    let mut previous = None;
    for sibling_id in parent.children() {
        let Some(sibling) = arena.get(*sibling_id) else {
            error!("Sibling {} of '{}' does not exist", sibling_id, path);
            return false;
        };
        if sibling.path() == path {
            occurrences += 1;
        }
        if let Some(previous) = previous {
            if sibling.compare(previous) != Ordering::Greater {
                error!(
                    "Siblings are not in strictly increasing order: '{}' then '{}'",
                    previous.path(),
                    sibling.path()
                );
                return false;
            }
        }
        previous = Some(sibling);
    }

    match occurrences {
        1 => true,
        0 => {
            error!("'{}' is missing from its parent's children", path);
            false
        }
        n => {
            error!("'{}' appears {} times among its parent's children", path, n);
            false
        }
    }
}

/// Checks the whole tree. `count` must equal the number of nodes reachable
/// from `root`, root included.
pub fn tree_is_valid(
    arena: &NodeArena,
    initialized: bool,
    root: Option<NodeId>,
    count: usize,
) -> bool {
    if !initialized {
        if root.is_some() {
            error!("Not initialized, but the root is present");
            return false;
        }
        if count != 0 {
            error!("Not initialized, but count is {}", count);
            return false;
        }
    }

    if (count == 0) != root.is_none() {
        error!("Count {} disagrees with root presence {:?}", count, root);
        return false;
    }

    let mut visited = 0;
    if let Some(root) = root {
        if arena.get(root).and_then(|node| node.parent()).is_some() {
            error!("The root {} has a parent", root);
            return false;
        }
        if !tree_check(arena, root, &mut visited) {
            return false;
        }
    }

    if visited != count {
        error!("Count is {} but {} nodes are reachable", count, visited);
        return false;
    }
    if arena.live() != count {
        error!("Count is {} but the arena holds {} nodes", count, arena.live());
        return false;
    }
    true
}

/// Pre-order walk that validates every node below and including `id`.
fn tree_check(arena: &NodeArena, id: NodeId, visited: &mut usize) -> bool {
    if !node_is_valid(arena, Some(id)) {
        return false;
    }
    *visited += 1;

    let Some(node) = arena.get(id) else {
        return false;
    };
    for index in 0..node.child_count() {
        let child = match arena.get_child(id, index) {
            Ok(child) => child,
            Err(e) => {
                error!("'{}' claims more children than it returns: {}", node.path(), e);
                return false;
            }
        };
        match arena.get(child) {
            Some(child_node) if child_node.parent() != Some(id) => {
                error!(
                    "'{}' is listed under '{}' but points at another parent",
                    child_node.path(),
                    node.path()
                );
                return false;
            }
            Some(_) => {}
            None => {
                error!("Child {} of '{}' does not exist", child, node.path());
                return false;
            }
        }
        if !tree_check(arena, child, visited) {
            return false;
        }
    }
    true
}
