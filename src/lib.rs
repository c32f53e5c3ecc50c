pub mod filesystem;

pub use filesystem::{
    FileTree, FileTreeConfig, FileTreeError, Node, NodeArena, NodeId, NodeKind, NodeStat, Path,
    PathError, checker,
};
