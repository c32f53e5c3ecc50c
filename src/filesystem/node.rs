use std::cmp::Ordering;

use bytes::Bytes;
use derive_more::Display;
use snafu::{OptionExt, ensure};
use tracing::{trace, warn};

use crate::filesystem::Path;
use crate::filesystem::error::{
    AlreadyInTreeSnafu, ConflictingPathSnafu, FileTreeError, NoSuchPathSnafu, NotADirectorySnafu,
    NotAFileSnafu, OutOfMemorySnafu, UnknownNodeSnafu,
};

/// Handle to a node slot inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("#{_0}")]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Children sorted by path, without duplicates.
    Directory { children: Vec<NodeId> },
    /// Caller-supplied buffer, held by reference.
    File { contents: Bytes },
}

/// A single file or directory of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) path: Path,
    pub(super) parent: Option<NodeId>,
    pub(super) kind: NodeKind,
}

impl Node {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Children of a directory, empty for a file.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn contents(&self) -> Option<&Bytes> {
        match &self.kind {
            NodeKind::File { contents } => Some(contents),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Length of the contents, 0 for a directory.
    pub fn file_size(&self) -> usize {
        self.contents().map_or(0, Bytes::len)
    }

    /// Orders nodes by path, the order siblings are kept in.
    pub fn compare(&self, other: &Node) -> Ordering {
        self.path.cmp(&other.path)
    }
}

/// Slot storage for the nodes of one tree.
///
/// Nodes refer to each other through [`NodeId`]s. A directory's children
/// belong to it: they only go away through [`NodeArena::destroy`] on the
/// directory or one of its ancestors. The parent id is a plain back-reference.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    vacant: Vec<NodeId>,
    live: usize,
    capacity: Option<usize>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// An arena that refuses to hold more than `capacity` live nodes.
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(super) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of nodes currently allocated.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn new_directory(
        &mut self,
        path: Path,
        parent: Option<NodeId>,
    ) -> Result<NodeId, FileTreeError> {
        let kind = NodeKind::Directory {
            children: Vec::new(),
        };
        match parent {
            Some(parent) => self.link_new(path, parent, kind),
            None => {
                ensure!(path.depth() == 1, NoSuchPathSnafu { path });
                self.reserve_slot(&path)?;
                Ok(self.store(Node {
                    path,
                    parent: None,
                    kind,
                }))
            }
        }
    }

    pub fn new_file(
        &mut self,
        path: Path,
        parent: Option<NodeId>,
        contents: impl Into<Bytes>,
    ) -> Result<NodeId, FileTreeError> {
        ensure!(path.depth() != 1, ConflictingPathSnafu { path });
        let parent = parent.context(NoSuchPathSnafu { path: path.clone() })?;
        let kind = NodeKind::File {
            contents: contents.into(),
        };
        self.link_new(path, parent, kind)
    }

    /// Validates `path` against `parent`, then stores the node and links it
    /// into the parent's children at its sorted position.
    fn link_new(
        &mut self,
        path: Path,
        parent: NodeId,
        kind: NodeKind,
    ) -> Result<NodeId, FileTreeError> {
        self.reserve_slot(&path)?;

        let parent_node = self
            .get(parent)
            .context(NoSuchPathSnafu { path: path.clone() })?;
        let parent_depth = parent_node.path.depth();
        ensure!(
            path.shared_prefix_depth(&parent_node.path) >= parent_depth,
            ConflictingPathSnafu { path }
        );
        ensure!(!parent_node.is_file(), NotADirectorySnafu { path });
        ensure!(
            path.depth() == parent_depth + 1,
            NoSuchPathSnafu { path }
        );
        let index = match self.has_child(parent, &path) {
            Ok(_) => return AlreadyInTreeSnafu { path }.fail(),
            Err(index) => index,
        };

        if let Some(NodeKind::Directory { children }) =
            self.get_mut(parent).map(|node| &mut node.kind)
        {
            children
                .try_reserve(1)
                .ok()
                .context(OutOfMemorySnafu { path: path.clone() })?;
        }

        trace!("Linking '{}' under '{}' at index {}", path, parent, index);
        let id = self.store(Node {
            path,
            parent: Some(parent),
            kind,
        });
        if let Some(NodeKind::Directory { children }) =
            self.get_mut(parent).map(|node| &mut node.kind)
        {
            children.insert(index, id);
        }
        Ok(id)
    }

    /// Makes sure one more node fits, without touching any existing node.
    fn reserve_slot(&mut self, path: &Path) -> Result<(), FileTreeError> {
        let within_capacity = self.capacity.is_none_or(|capacity| self.live < capacity);
        ensure!(within_capacity, OutOfMemorySnafu { path: path.clone() });
        if self.vacant.is_empty() {
            self.slots
                .try_reserve(1)
                .ok()
                .context(OutOfMemorySnafu { path: path.clone() })?;
        }
        Ok(())
    }

    fn store(&mut self, node: Node) -> NodeId {
        self.live += 1;
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Destroys `id` and its whole subtree, children before their parent,
    /// and unlinks it from its own parent. Returns the number of nodes freed.
    pub fn destroy(&mut self, id: NodeId) -> usize {
        let children = match self.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Directory { children }) => std::mem::take(children),
            _ => Vec::new(),
        };
        let freed = children
            .into_iter()
            .map(|child| self.destroy(child))
            .sum::<usize>();

        if let Some(parent) = self.get(id).and_then(Node::parent) {
            self.unlink(parent, id);
        }
        if self.slots.get_mut(id.0).and_then(Option::take).is_none() {
            return freed;
        }
        self.vacant.push(id);
        self.live -= 1;
        freed + 1
    }

    /// Removes `id` from `parent`'s children, locating it by path order.
    fn unlink(&mut self, parent: NodeId, id: NodeId) {
        let (Some(parent_node), Some(node)) = (self.get(parent), self.get(id)) else {
            return;
        };
        let found = parent_node.children().binary_search_by(|sibling| {
            self.get(*sibling)
                .map_or(Ordering::Less, |sibling| sibling.compare(node))
        });
        if let Ok(index) = found {
            if let Some(NodeKind::Directory { children }) =
                self.get_mut(parent).map(|node| &mut node.kind)
            {
                children.remove(index);
            }
        }
    }

    /// Searches `parent`'s children for `path`. `Ok` carries the index of the
    /// match, `Err` the index an insertion would take. A file parent never
    /// has the child.
    pub fn has_child(&self, parent: NodeId, path: &Path) -> Result<usize, usize> {
        let Some(parent) = self.get(parent) else {
            return Err(0);
        };
        parent.children().binary_search_by(|child| {
            self.get(*child)
                .map_or(Ordering::Less, |child| child.path.compare_str(path.pathname()))
        })
    }

    pub fn get_child(&self, parent: NodeId, index: usize) -> Result<NodeId, FileTreeError> {
        let node = self.get(parent).context(UnknownNodeSnafu { id: parent })?;
        match &node.kind {
            NodeKind::File { .. } => NotADirectorySnafu {
                path: node.path.clone(),
            }
            .fail(),
            NodeKind::Directory { children } => {
                children.get(index).copied().context(NoSuchPathSnafu {
                    path: node.path.clone(),
                })
            }
        }
    }

    /// Swaps a file's contents and hands back the previous buffer.
    pub fn replace_contents(
        &mut self,
        id: NodeId,
        new_contents: impl Into<Bytes>,
    ) -> Result<Bytes, FileTreeError> {
        let node = self.get_mut(id).context(UnknownNodeSnafu { id })?;
        match &mut node.kind {
            NodeKind::File { contents } => Ok(std::mem::replace(contents, new_contents.into())),
            NodeKind::Directory { .. } => {
                warn!("Contents of '{}' cannot be replaced, it is not a file", node.path);
                NotAFileSnafu {
                    path: node.path.clone(),
                }
                .fail()
            }
        }
    }
}
