use snafu::Snafu;

use crate::filesystem::{NodeId, Path, PathError};

/// Every non-success status a [`FileTree`](super::FileTree) or
/// [`NodeArena`](super::NodeArena) operation can report.
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum FileTreeError {
    #[snafu(display("The file tree is not initialized"))]
    NotInitialized,
    #[snafu(display("The file tree is already initialized"))]
    AlreadyInitialized,
    #[snafu(display("Malformed path"))]
    BadPath { source: PathError },
    #[snafu(display("Path '{}' lies outside of the tree's namespace", path))]
    ConflictingPath { path: Path },
    #[snafu(display("No node exists at '{}'", path))]
    NoSuchPath { path: Path },
    #[snafu(display("A node already exists at '{}'", path))]
    AlreadyInTree { path: Path },
    #[snafu(display("'{}' is not a directory", path))]
    NotADirectory { path: Path },
    #[snafu(display("'{}' is not a file", path))]
    NotAFile { path: Path },
    #[snafu(display("Ran out of node storage while creating '{}'", path))]
    OutOfMemory { path: Path },
    #[snafu(display("Node handle {} does not belong to a live node", id))]
    UnknownNode { id: NodeId },
}
