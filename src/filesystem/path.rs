use std::cmp::Ordering;

use derive_more::Display;
use snafu::{Snafu, ensure};

const SEPARATOR: char = '/';

/// Canonical absolute path inside a [`FileTree`](super::FileTree).
///
/// A single leading separator is accepted and dropped, so `/a/b` and `a/b`
/// name the same node. The rendered form never starts with a separator.
/// Ordering is byte-wise on the rendered form, which keeps `a/b` before
/// `a/b/c` before `a/c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{pathname}")]
pub struct Path {
    pathname: String,
    // byte offset of the end of each component within `pathname`
    ends: Vec<usize>,
}

impl Path {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let raw = raw.as_ref();
        let body = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
        ensure!(!body.is_empty(), EmptyPathSnafu);

        let mut ends = Vec::new();
        let mut offset = 0;
        for component in body.split(SEPARATOR) {
            ensure!(
                !component.is_empty(),
                EmptyComponentSnafu {
                    path: raw.to_string()
                }
            );
            offset += component.len();
            ends.push(offset);
            offset += SEPARATOR.len_utf8();
        }

        Ok(Self {
            pathname: body.to_string(),
            ends,
        })
    }

    /// Number of components. Always at least one.
    pub fn depth(&self) -> usize {
        self.ends.len()
    }

    /// The ancestor of this path at `depth`, which must be in `1..=self.depth()`.
    pub fn prefix(&self, depth: usize) -> Result<Self, PathError> {
        ensure!(
            depth >= 1 && depth <= self.depth(),
            DepthOutOfRangeSnafu {
                path: self.pathname.clone(),
                depth,
            }
        );
        let end = self.ends[depth - 1];
        Ok(Self {
            pathname: self.pathname[..end].to_string(),
            ends: self.ends[..depth].to_vec(),
        })
    }

    pub fn shared_prefix_depth(&self, other: &Path) -> usize {
        self.components()
            .zip(other.components())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn compare_str(&self, raw: &str) -> Ordering {
        self.pathname.as_str().cmp(raw)
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Length of the rendered pathname in bytes.
    pub fn len(&self) -> usize {
        self.pathname.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathname.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.pathname.split(SEPARATOR)
    }

    /// Final component.
    pub fn name(&self) -> &str {
        let start = match self.depth() {
            1 => 0,
            depth => self.ends[depth - 2] + SEPARATOR.len_utf8(),
        };
        &self.pathname[start..]
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pathname.cmp(&other.pathname)
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Path::new(raw)
    }
}

#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum PathError {
    #[snafu(display("A path needs at least one component"))]
    EmptyPath,
    #[snafu(display("Path '{}' contains an empty component", path))]
    EmptyComponent { path: String },
    #[snafu(display("Path '{}' has no prefix of depth {}", path, depth))]
    DepthOutOfRange { path: String, depth: usize },
}
