use thiserror::Error;

use crate::path::PathError;

/// Errors surfaced by [crate::FileTree] operations.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// The path argument was empty, relative, or otherwise malformed.
    #[error("invalid path {path:?}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },
    /// No node exists at the given path.
    #[error("no node found at {0:?}")]
    NotFound(String),
    /// Strict add refused to overwrite an existing node.
    #[error("a node already exists at {0:?}")]
    AlreadyExists(String),
    /// The tree root cannot be removed.
    #[error("cannot remove the tree root")]
    RootRemoval,
}

impl TreeError {
    pub(crate) fn invalid_path(path: &str, source: PathError) -> Self {
        TreeError::InvalidPath {
            path: path.to_string(),
            source,
        }
    }
}

/// A per-layer failure reported by [crate::stack_range]. Offending layers
/// are skipped; the remaining layers are still applied.
#[derive(Debug, Error, PartialEq)]
#[error("failed to stack layer {layer_index}")]
pub struct StackError {
    pub layer_index: usize,
    #[source]
    pub source: TreeError,
}
