//! The absolute, `/`-separated paths the tree engine works in, and the
//! validated basenames they are made of. Platform-independent, which
//! distinguishes them from the paths in the standard library.
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use bstr::ByteSlice;

/// Longest basename the engine accepts; matches the kernel's NAME_MAX.
pub const MAX_NAME_LEN: usize = 255;

/// Basenames carrying this prefix are whiteout sentinels: they instruct the
/// stack operation to delete the sibling named by the remainder.
pub const WHITEOUT_PREFIX: &[u8] = b".wh.";

/// Why a basename was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("'.' and '..' are reserved")]
    Reserved,
    #[error("name contains a '/' or NUL byte")]
    IllegalByte,
    #[error("name is longer than {MAX_NAME_LEN} bytes")]
    TooLong,
}

fn check_name(name: &[u8]) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name == b"." || name == b".." {
        return Err(NameError::Reserved);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if name.iter().any(|b| *b == b'/' || *b == 0) {
        return Err(NameError::IllegalByte);
    }
    Ok(())
}

/// A validated basename naming one tree node. Kept as raw bytes, since tar
/// entry names are byte strings with no promised encoding.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathComponent {
    inner: bytes::Bytes,
}

impl PathComponent {
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Whether this name is a whiteout sentinel.
    pub fn is_whiteout(&self) -> bool {
        self.inner.starts_with(WHITEOUT_PREFIX)
    }

    /// The sibling name a whiteout deletes: the component with the `.wh.`
    /// prefix stripped. Returns `None` for non-whiteouts, and for malformed
    /// sentinels whose remainder is not a usable name (a bare `.wh.`, or a
    /// whiteout of `.` or `..`).
    pub fn whiteout_stem(&self) -> Option<PathComponent> {
        if !self.is_whiteout() {
            return None;
        }
        let stem = self.inner.slice(WHITEOUT_PREFIX.len()..);
        check_name(&stem).ok()?;
        Some(PathComponent { inner: stem })
    }
}

impl TryFrom<bytes::Bytes> for PathComponent {
    type Error = NameError;

    fn try_from(value: bytes::Bytes) -> Result<Self, Self::Error> {
        check_name(&value)?;
        Ok(Self { inner: value })
    }
}

impl TryFrom<&[u8]> for PathComponent {
    type Error = NameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        check_name(value)?;
        Ok(Self {
            inner: bytes::Bytes::copy_from_slice(value),
        })
    }
}

impl TryFrom<&str> for PathComponent {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.as_bytes().try_into()
    }
}

impl Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner.as_bstr())
    }
}

impl Debug for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.inner.as_bstr())
    }
}

/// Errors created when parsing a [NodePath] or resolving a tree operation's
/// path argument.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PathError {
    /// The path did not start with a `/`.
    #[error("path is not absolute")]
    NotAbsolute,
    /// The path names the root, which the operation does not accept.
    #[error("path names the root")]
    Root,
    #[error("invalid name in path: {0}")]
    Name(#[from] NameError),
    /// A whiteout sentinel whose stripped remainder names no sibling.
    #[error("whiteout names no deletable sibling")]
    BadWhiteoutTarget,
}

/// An absolute path to a tree node, held as the sequence of validated
/// component names from the root down. The empty sequence is the root
/// itself; [Display] prints it as `/`.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath {
    components: Vec<PathComponent>,
}

impl NodePath {
    pub fn root() -> NodePath {
        NodePath::default()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The component names from the root down.
    pub fn components(&self) -> impl Iterator<Item = &PathComponent> {
        self.components.iter()
    }

    pub fn into_components(self) -> Vec<PathComponent> {
        self.components
    }

    /// The final component, if there is one.
    pub fn file_name(&self) -> Option<&PathComponent> {
        self.components.last()
    }

    /// The path without its final component; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        let (_, rest) = self.components.split_last()?;
        Some(NodePath {
            components: rest.to_vec(),
        })
    }
}

/// Parses an absolute path. A leading `/` is required; repeated and
/// trailing separators collapse away. `/` alone parses to the root.
impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<NodePath, PathError> {
        let rest = s.strip_prefix('/').ok_or(PathError::NotAbsolute)?;

        let mut components = Vec::new();
        for segment in rest.split('/').filter(|segment| !segment.is_empty()) {
            components.push(PathComponent::try_from(segment)?);
        }
        Ok(NodePath { components })
    }
}

impl FromIterator<PathComponent> for NodePath {
    fn from_iter<I: IntoIterator<Item = PathComponent>>(iter: I) -> Self {
        NodePath {
            components: iter.into_iter().collect(),
        }
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
