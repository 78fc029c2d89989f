use std::collections::BTreeMap;

use crate::fileinfo::FileInfo;
use crate::path::PathComponent;

use super::diff::DiffType;

/// Index of a node in its tree's arena. Handles are only meaningful for the
/// tree that issued them, and go stale once the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(super) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Presentation-only flags. Preserved by [super::FileTree::copy], ignored by
/// stacking and diffing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewInfo {
    /// Skipped entirely by the renderer.
    pub hidden: bool,
    /// Rendered, but the renderer does not descend into the children.
    pub collapsed: bool,
}

/// The per-node state: the loader-supplied record, the classification the
/// last compare produced, and the presentation flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    pub file_info: FileInfo,
    pub diff_type: DiffType,
    pub view_info: ViewInfo,
}

/// One node of a [super::FileTree]. The root has no name and no parent;
/// every other node is reachable through its parent's child map.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub(super) name: Option<PathComponent>,
    pub data: NodeData,
    pub(super) parent: Option<NodeId>,
    // BTreeMap keeps the children in ascending name order, so traversal and
    // rendering are deterministic without per-access sorting.
    pub(super) children: BTreeMap<PathComponent, NodeId>,
}

impl FileNode {
    pub(super) fn new_root() -> Self {
        FileNode {
            name: None,
            data: NodeData::default(),
            parent: None,
            children: BTreeMap::new(),
        }
    }

    pub(super) fn new(name: PathComponent, parent: NodeId, file_info: FileInfo) -> Self {
        FileNode {
            name: Some(name),
            data: NodeData {
                file_info,
                ..NodeData::default()
            },
            parent: Some(parent),
            children: BTreeMap::new(),
        }
    }

    /// The node's basename; `None` for the root.
    pub fn name(&self) -> Option<&PathComponent> {
        self.name.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The node's children in ascending name order.
    pub fn children(&self) -> impl Iterator<Item = (&PathComponent, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name, *id))
    }

    pub fn child(&self, name: &PathComponent) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_whiteout(&self) -> bool {
        self.name.as_ref().is_some_and(|name| name.is_whiteout())
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.data.file_info
    }
}
