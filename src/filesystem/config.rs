/// Knobs for a single [`FileTree`](super::FileTree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeConfig {
    /// Run the full invariant checker before and after every mutation.
    pub check_invariants: bool,
    /// Maximum number of live nodes, `None` for no limit.
    pub node_capacity: Option<usize>,
}

impl Default for FileTreeConfig {
    fn default() -> Self {
        Self {
            check_invariants: cfg!(debug_assertions),
            node_capacity: None,
        }
    }
}

impl FileTreeConfig {
    pub fn with_check_invariants(mut self, check_invariants: bool) -> Self {
        self.check_invariants = check_invariants;
        self
    }

    pub fn with_node_capacity(mut self, node_capacity: Option<usize>) -> Self {
        self.node_capacity = node_capacity;
        self
    }
}
