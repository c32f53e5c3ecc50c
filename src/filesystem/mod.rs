//! In-memory hierarchy of directories and files.
//!
//! A [`FileTree`] owns every node through a [`NodeArena`]. Directories keep
//! their children sorted by [`Path`], files hold a caller-supplied buffer.
//! The [`checker`] module re-derives all structural invariants and is run
//! around every mutation when enabled in [`FileTreeConfig`].

pub mod checker;
mod config;
mod error;
mod node;
mod path;
mod tree;

pub use config::FileTreeConfig;
pub use error::FileTreeError;
pub use node::{Node, NodeArena, NodeId, NodeKind};
pub use path::{Path, PathError};
pub use tree::{FileTree, NodeStat};
