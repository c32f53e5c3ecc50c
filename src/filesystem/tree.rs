use bytes::Bytes;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, trace};

use crate::filesystem::checker;
use crate::filesystem::error::{
    AlreadyInTreeSnafu, AlreadyInitializedSnafu, BadPathSnafu, ConflictingPathSnafu,
    FileTreeError, NoSuchPathSnafu, NotADirectorySnafu, NotAFileSnafu, NotInitializedSnafu,
    UnknownNodeSnafu,
};
use crate::filesystem::{FileTreeConfig, Node, NodeArena, NodeId, Path};

/// Type and size of a node, as reported by [`FileTree::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStat {
    Directory,
    File { size: usize },
}

/// What the deepest level of an insertion turns into.
enum Leaf {
    Directory,
    File(Bytes),
}

/// An in-memory hierarchy of directories and files.
///
/// The tree has to be [`init`](FileTree::init)ialized before use and can be
/// [`destroy`](FileTree::destroy)ed and initialized again. All nodes hang
/// off a single root directory. Inserting a path creates every missing
/// ancestor directory in the same call, and a failed insertion leaves the
/// tree exactly as it was.
#[derive(Debug)]
pub struct FileTree {
    config: FileTreeConfig,
    arena: NodeArena,
    initialized: bool,
    root: Option<NodeId>,
    count: usize,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::with_config(FileTreeConfig::default())
    }
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FileTreeConfig) -> Self {
        Self {
            arena: NodeArena::with_capacity_limit(config.node_capacity),
            config,
            initialized: false,
            root: None,
            count: 0,
        }
    }

    pub fn config(&self) -> &FileTreeConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the tree, root included.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Runs the full invariant checker over the current state.
    pub fn is_valid(&self) -> bool {
        checker::tree_is_valid(&self.arena, self.initialized, self.root, self.count)
    }

    fn check_invariants(&self) {
        if self.config.check_invariants {
            assert!(self.is_valid(), "file tree invariant violated");
        }
    }

    pub fn init(&mut self) -> Result<(), FileTreeError> {
        self.check_invariants();
        ensure!(!self.initialized, AlreadyInitializedSnafu);

        self.initialized = true;
        self.root = None;
        self.count = 0;
        debug!("Initialized file tree");

        self.check_invariants();
        Ok(())
    }

    pub fn destroy(&mut self) -> Result<(), FileTreeError> {
        self.check_invariants();
        ensure!(self.initialized, NotInitializedSnafu);

        if let Some(root) = self.root.take() {
            let freed = self.arena.destroy(root);
            self.count = self.count.saturating_sub(freed);
            debug!("Freed {} nodes while destroying file tree", freed);
        }
        self.initialized = false;

        self.check_invariants();
        Ok(())
    }

    /// Walks from the root towards `path` for as long as the nodes exist and
    /// returns the deepest one reached. `None` means the tree has no root.
    pub fn traverse_path(&self, path: &Path) -> Result<Option<NodeId>, FileTreeError> {
        let Some(root) = self.root else {
            return Ok(None);
        };

        let top = path.prefix(1).context(BadPathSnafu)?;
        let root_node = self.arena.get(root).context(UnknownNodeSnafu { id: root })?;
        ensure!(
            root_node.path() == &top,
            ConflictingPathSnafu { path: path.clone() }
        );

        let mut current = root;
        for depth in 2..=path.depth() {
            let prefix = path.prefix(depth).context(BadPathSnafu)?;
            match self.arena.has_child(current, &prefix) {
                Ok(index) => current = self.arena.get_child(current, index)?,
                Err(_) => break,
            }
            trace!("Traversed to '{}'", prefix);
        }

        Ok(Some(current))
    }

    /// Resolves `path` to the node stored at exactly that path.
    pub fn find_node(&self, path: &str) -> Result<NodeId, FileTreeError> {
        ensure!(self.initialized, NotInitializedSnafu);
        let path = Path::new(path).context(BadPathSnafu)?;
        self.find(&path)
    }

    fn find(&self, path: &Path) -> Result<NodeId, FileTreeError> {
        let found = self
            .traverse_path(path)?
            .context(NoSuchPathSnafu { path: path.clone() })?;
        let reached = self.arena.get(found).map(Node::path);
        ensure!(reached == Some(path), NoSuchPathSnafu { path: path.clone() });
        Ok(found)
    }

    pub fn insert_directory(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.insert(path, Leaf::Directory)
    }

    /// Inserts a file at `path`, creating the missing parent directories.
    /// The tree keeps a reference to `contents`, it does not copy the bytes.
    pub fn insert_file(
        &mut self,
        path: &str,
        contents: impl Into<Bytes>,
    ) -> Result<(), FileTreeError> {
        self.insert(path, Leaf::File(contents.into()))
    }

    fn insert(&mut self, raw: &str, leaf: Leaf) -> Result<(), FileTreeError> {
        self.check_invariants();
        ensure!(self.initialized, NotInitializedSnafu);

        let path = Path::new(raw).context(BadPathSnafu)?;
        let anchor = self.traverse_path(&path)?;
        let start = match anchor {
            None => {
                // files never become the root
                let roots_allowed = self.root.is_none() && matches!(leaf, Leaf::Directory);
                ensure!(roots_allowed, ConflictingPathSnafu { path });
                1
            }
            Some(anchor) => {
                let node = self
                    .arena
                    .get(anchor)
                    .context(UnknownNodeSnafu { id: anchor })?;
                ensure!(
                    !node.is_file(),
                    NotADirectorySnafu {
                        path: node.path().clone()
                    }
                );
                ensure!(node.path() != &path, AlreadyInTreeSnafu { path });
                node.path().depth() + 1
            }
        };

        let mut first_new = None;
        if let Err(error) = self.build_chain(&path, anchor, start, leaf, &mut first_new) {
            if let Some(first) = first_new {
                let undone = self.arena.destroy(first);
                debug!("Rolled back {} nodes after failing to insert '{}'", undone, path);
            }
            self.check_invariants();
            return Err(error);
        }

        let created = path.depth() + 1 - start;
        if self.root.is_none() {
            self.root = first_new;
        }
        self.count += created;
        debug!("Inserted '{}', materializing {} nodes", path, created);

        self.check_invariants();
        Ok(())
    }

    /// Creates the levels `start..=depth` of `path` below `anchor`, one node
    /// per level. The first node created is reported through `first_new` so
    /// the caller can undo the whole chain.
    fn build_chain(
        &mut self,
        path: &Path,
        anchor: Option<NodeId>,
        start: usize,
        leaf: Leaf,
        first_new: &mut Option<NodeId>,
    ) -> Result<(), FileTreeError> {
        let mut parent = anchor;
        for depth in start..path.depth() {
            let prefix = path.prefix(depth).context(BadPathSnafu)?;
            let id = self.arena.new_directory(prefix, parent)?;
            first_new.get_or_insert(id);
            parent = Some(id);
        }

        let id = match leaf {
            Leaf::Directory => self.arena.new_directory(path.clone(), parent)?,
            Leaf::File(contents) => self.arena.new_file(path.clone(), parent, contents)?,
        };
        first_new.get_or_insert(id);
        Ok(())
    }

    pub fn remove_directory(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.remove(path, false)
    }

    pub fn remove_file(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.remove(path, true)
    }

    fn remove(&mut self, raw: &str, expect_file: bool) -> Result<(), FileTreeError> {
        self.check_invariants();

        let id = self.find_node(raw)?;
        let node = self.arena.get(id).context(UnknownNodeSnafu { id })?;
        match (node.is_file(), expect_file) {
            (true, false) => {
                return NotADirectorySnafu {
                    path: node.path().clone(),
                }
                .fail();
            }
            (false, true) => {
                return NotAFileSnafu {
                    path: node.path().clone(),
                }
                .fail();
            }
            _ => {}
        }

        let freed = self.arena.destroy(id);
        self.count = self.count.saturating_sub(freed);
        if self.count == 0 {
            self.root = None;
        }
        debug!("Removed '{}' ({} nodes)", raw, freed);

        self.check_invariants();
        Ok(())
    }

    pub fn contains_directory(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(|node| !node.is_file())
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(Node::is_file)
    }

    fn lookup(&self, path: &str) -> Option<&Node> {
        self.find_node(path).ok().and_then(|id| self.arena.get(id))
    }

    /// Contents of the file at `path`. `None` for directories and absent paths.
    pub fn get_file_contents(&self, path: &str) -> Option<Bytes> {
        self.lookup(path)?.contents().cloned()
    }

    /// Swaps the contents of the file at `path`, returning the previous
    /// buffer. Directories and absent paths are left alone and yield `None`.
    pub fn replace_file_contents(
        &mut self,
        path: &str,
        new_contents: impl Into<Bytes>,
    ) -> Option<Bytes> {
        self.check_invariants();

        let id = self.find_node(path).ok()?;
        let old = self.arena.replace_contents(id, new_contents).ok();

        self.check_invariants();
        old
    }

    pub fn stat(&self, path: &str) -> Result<NodeStat, FileTreeError> {
        let id = self.find_node(path)?;
        let node = self.arena.get(id).context(UnknownNodeSnafu { id })?;
        Ok(match node.contents() {
            Some(contents) => NodeStat::File {
                size: contents.len(),
            },
            None => NodeStat::Directory,
        })
    }

    /// Every path in the tree, one per line, parents before children and
    /// siblings in order. `None` when the tree is not initialized.
    pub fn dump(&self) -> Option<String> {
        if !self.initialized {
            return None;
        }

        let mut nodes = Vec::with_capacity(self.count);
        if let Some(root) = self.root {
            self.pre_order(root, &mut nodes);
        }

        let length = nodes.iter().map(|node| node.path().len() + 1).sum();
        let dump = nodes
            .iter()
            .fold(String::with_capacity(length), |mut acc, node| {
                acc.push_str(node.path().pathname());
                acc.push('\n');
                acc
            });
        Some(dump)
    }

    fn pre_order<'a>(&'a self, id: NodeId, out: &mut Vec<&'a Node>) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        out.push(node);
        for child in node.children() {
            self.pre_order(*child, out);
        }
    }
}
