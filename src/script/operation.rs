use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use derive_more::Display;
use ftree::{FileTree, FileTreeError, NodeStat};
use hashlink::LinkedHashMap;
use saphyr::{Scalar, Yaml};
use tracing::{debug, warn};

/// One step of a script, applied to a [`FileTree`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Operation {
    #[display("insertDirectory {path}")]
    InsertDirectory { path: String },
    #[display("insertFile {path}")]
    InsertFile { path: String, contents: String },
    #[display("removeDirectory {path}")]
    RemoveDirectory { path: String },
    #[display("removeFile {path}")]
    RemoveFile { path: String },
    #[display("containsDirectory {path}")]
    ContainsDirectory { path: String },
    #[display("containsFile {path}")]
    ContainsFile { path: String },
    #[display("getFileContents {path}")]
    GetFileContents { path: String },
    #[display("replaceFileContents {path}")]
    ReplaceFileContents { path: String, contents: String },
    #[display("stat {path}")]
    Stat { path: String },
    #[display("dump")]
    Dump,
}

/// What running an [`Operation`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    Failed(FileTreeError),
    Answer(bool),
    Contents(Option<Bytes>),
    Stat(NodeStat),
    Dump(Option<String>),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => write!(f, "ok"),
            Outcome::Failed(error) => write!(f, "{error}"),
            Outcome::Answer(answer) => write!(f, "{answer}"),
            Outcome::Contents(Some(contents)) => {
                write!(f, "{:?}", String::from_utf8_lossy(contents))
            }
            Outcome::Contents(None) | Outcome::Dump(None) => write!(f, "none"),
            Outcome::Stat(NodeStat::Directory) => write!(f, "directory"),
            Outcome::Stat(NodeStat::File { size }) => write!(f, "file, {size} bytes"),
            Outcome::Dump(Some(dump)) => write!(f, "\n{}", dump.trim_end()),
        }
    }
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

impl Operation {
    /// Parses a script entry: either the bare string `dump`, or a mapping with
    /// a single operation name whose value is a path or a
    /// `{ path, contents }` mapping. Entries that don't fit are skipped.
    pub fn from_yaml(entry: &Yaml) -> Option<Self> {
        let operation = Self::parse_entry(entry);
        if operation.is_none() {
            warn!("Skipping invalid operation entry: {:?}", entry);
        }
        operation
    }

    fn parse_entry(entry: &Yaml) -> Option<Self> {
        if let Some("dump") = entry.as_str() {
            return Some(Operation::Dump);
        }

        let mapping = entry.as_mapping()?;
        if mapping.len() != 1 {
            debug!("Operation entry has {} keys, expected one", mapping.len());
            return None;
        }
        let (name, argument) = mapping.iter().next()?;
        let name = name.as_str()?;
        debug!("Parsing operation '{}'", name);

        match name {
            "insertDirectory" => Some(Operation::InsertDirectory {
                path: Self::path_argument(argument)?,
            }),
            "removeDirectory" => Some(Operation::RemoveDirectory {
                path: Self::path_argument(argument)?,
            }),
            "removeFile" => Some(Operation::RemoveFile {
                path: Self::path_argument(argument)?,
            }),
            "containsDirectory" => Some(Operation::ContainsDirectory {
                path: Self::path_argument(argument)?,
            }),
            "containsFile" => Some(Operation::ContainsFile {
                path: Self::path_argument(argument)?,
            }),
            "getFileContents" => Some(Operation::GetFileContents {
                path: Self::path_argument(argument)?,
            }),
            "stat" => Some(Operation::Stat {
                path: Self::path_argument(argument)?,
            }),
            "insertFile" => {
                let (path, contents) = Self::file_argument(argument.as_mapping()?)?;
                Some(Operation::InsertFile { path, contents })
            }
            "replaceFileContents" => {
                let (path, contents) = Self::file_argument(argument.as_mapping()?)?;
                Some(Operation::ReplaceFileContents { path, contents })
            }
            _ => {
                debug!("Unknown operation '{}'", name);
                None
            }
        }
    }

    fn path_argument(argument: &Yaml) -> Option<String> {
        argument.as_str().map(str::to_string)
    }

    fn file_argument(argument: &LinkedHashMap<Yaml, Yaml>) -> Option<(String, String)> {
        let path = argument.get(&key("path"))?.as_str()?.to_string();
        let contents = match argument.get(&key("contents")) {
            None | Some(Yaml::Value(Scalar::Null)) => String::new(),
            Some(Yaml::Value(scalar)) => Self::scalar_text(scalar),
            Some(other) => {
                debug!("File contents must be a scalar, got {:?}", other);
                return None;
            }
        };
        Some((path, contents))
    }

    /// Plain scalars like `42` or `true` are resolved by the YAML loader,
    /// so they are turned back into text here.
    fn scalar_text(scalar: &Scalar) -> String {
        match scalar {
            Scalar::Null => String::new(),
            Scalar::Boolean(value) => value.to_string(),
            Scalar::Integer(value) => value.to_string(),
            Scalar::FloatingPoint(value) => value.to_string(),
            Scalar::String(value) => value.to_string(),
        }
    }

    pub fn run(&self, tree: &mut FileTree) -> Outcome {
        let status = |result: Result<(), FileTreeError>| match result {
            Ok(()) => Outcome::Done,
            Err(error) => Outcome::Failed(error),
        };

        match self {
            Operation::InsertDirectory { path } => status(tree.insert_directory(path)),
            Operation::InsertFile { path, contents } => {
                status(tree.insert_file(path, Bytes::from(contents.clone())))
            }
            Operation::RemoveDirectory { path } => status(tree.remove_directory(path)),
            Operation::RemoveFile { path } => status(tree.remove_file(path)),
            Operation::ContainsDirectory { path } => Outcome::Answer(tree.contains_directory(path)),
            Operation::ContainsFile { path } => Outcome::Answer(tree.contains_file(path)),
            Operation::GetFileContents { path } => Outcome::Contents(tree.get_file_contents(path)),
            Operation::ReplaceFileContents { path, contents } => Outcome::Contents(
                tree.replace_file_contents(path, Bytes::from(contents.clone())),
            ),
            Operation::Stat { path } => match tree.stat(path) {
                Ok(stat) => Outcome::Stat(stat),
                Err(error) => Outcome::Failed(error),
            },
            Operation::Dump => Outcome::Dump(tree.dump()),
        }
    }
}
