//! The path-indexed tree of one image layer, and the algorithms layered on
//! top of it (stacking, diffing, efficiency accounting, rendering).
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::TreeError;
use crate::fileinfo::FileInfo;
use crate::path::{NodePath, PathComponent, PathError};

mod diff;
mod efficiency;
mod node;
mod render;
mod stack;

pub use diff::DiffType;
pub use efficiency::{efficiency_map, efficiency_score};
pub use node::{FileNode, NodeData, NodeId, ViewInfo};
pub use stack::stack_range;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identifier of a [FileTree]. Every construction,
/// including [FileTree::copy], mints a fresh one, so stacked and copied
/// trees can be told apart from their sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

impl TreeId {
    fn mint() -> Self {
        TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A rooted tree of path nodes describing the filesystem of one layer.
///
/// Nodes live in an arena indexed by [NodeId]; parent and child links are
/// ids, so the tree exclusively owns every node and cyclic references never
/// arise. A single tree must be mutated from one thread at a time; distinct
/// trees are independent.
pub struct FileTree {
    nodes: Vec<Option<FileNode>>,
    free: Vec<NodeId>,
    root: NodeId,
    size: usize,
    file_size: u64,
    id: TreeId,
    name: Option<String>,
}

impl FileTree {
    /// Creates a tree holding only the unnamed root.
    pub fn new() -> Self {
        FileTree {
            nodes: vec![Some(FileNode::new_root())],
            free: Vec::new(),
            root: NodeId::from_index(0),
            size: 0,
            file_size: 0,
            id: TreeId::mint(),
            name: None,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, excluding the root.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sum of `file_info.size` over all regular-file nodes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Looks up a node by id. Returns `None` for stale ids.
    pub fn node(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Looks up a node for mutation. Only [NodeData] is exposed mutably;
    /// structural links stay under the tree's control.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FileNode> {
        self.nodes
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
    }

    pub(crate) fn get(&self, id: NodeId) -> &FileNode {
        self.nodes[id.index()]
            .as_ref()
            .expect("node id refers to a live node")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut FileNode {
        self.nodes[id.index()]
            .as_mut()
            .expect("node id refers to a live node")
    }

    fn alloc(&mut self, node: FileNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId::from_index(self.nodes.len());
                self.nodes.push(Some(node));
                id
            }
        }
    }

    /// Creates a child of `parent` with the given name and record. If the
    /// child already exists its record is overwritten in place (its subtree
    /// is untouched) and the existing node is returned; duplicates are never
    /// created.
    pub fn add_child(&mut self, parent: NodeId, name: PathComponent, file_info: FileInfo) -> NodeId {
        if let Some(existing) = self.get(parent).child(&name) {
            let new_is_regular = file_info.is_regular();
            let new_size = file_info.size;
            let old = std::mem::replace(&mut self.get_mut(existing).data.file_info, file_info);
            if old.is_regular() {
                self.file_size -= old.size;
            }
            if new_is_regular {
                self.file_size += new_size;
            }
            return existing;
        }

        let is_regular = file_info.is_regular();
        let info_size = file_info.size;
        let id = self.alloc(FileNode::new(name.clone(), parent, file_info));
        self.get_mut(parent).children.insert(name, id);
        self.size += 1;
        if is_regular {
            self.file_size += info_size;
        }
        id
    }

    /// Inserts a record at `path`, creating missing intermediate directories
    /// with [FileInfo::directory]. An existing node at the final segment is
    /// overwritten. Fails only for paths that are malformed or name the
    /// root.
    pub fn add_path(&mut self, path: &str, file_info: FileInfo) -> Result<NodeId, TreeError> {
        let (parent, name) = self.resolve_parent_for_insert(path)?;
        Ok(self.add_child(parent, name, file_info))
    }

    /// Like [FileTree::add_path], but refuses to overwrite: fails with
    /// `AlreadyExists` if a node is already present at the final segment.
    pub fn add_path_new(&mut self, path: &str, file_info: FileInfo) -> Result<NodeId, TreeError> {
        let (parent, name) = self.resolve_parent_for_insert(path)?;
        if self.get(parent).child(&name).is_some() {
            return Err(TreeError::AlreadyExists(path.to_string()));
        }
        Ok(self.add_child(parent, name, file_info))
    }

    /// Walks to the parent of `path`'s final segment, creating missing
    /// intermediate directories, and returns it with the final name.
    fn resolve_parent_for_insert(
        &mut self,
        path: &str,
    ) -> Result<(NodeId, PathComponent), TreeError> {
        let parsed: NodePath = path
            .parse()
            .map_err(|source| TreeError::invalid_path(path, source))?;

        let mut components = parsed.into_components();
        let name = components
            .pop()
            .ok_or_else(|| TreeError::invalid_path(path, PathError::Root))?;

        let mut current = self.root;
        for component in components {
            current = match self.get(current).child(&component) {
                Some(child) => child,
                None => self.add_child(current, component, FileInfo::directory()),
            };
        }
        Ok((current, name))
    }

    /// Resolves a path to a node id. The root path resolves to the root.
    pub fn get_node(&self, path: &str) -> Result<NodeId, TreeError> {
        let parsed: NodePath = path
            .parse()
            .map_err(|source| TreeError::invalid_path(path, source))?;
        self.resolve(&parsed)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))
    }

    pub(crate) fn resolve(&self, path: &NodePath) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.components() {
            current = self.get(current).child(component)?;
        }
        Some(current)
    }

    /// Unlinks the subtree rooted at `id` and returns the number of nodes
    /// removed. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let node = self.get(id);
        let (Some(parent), Some(name)) = (node.parent, node.name.clone()) else {
            return Err(TreeError::RootRemoval);
        };
        self.get_mut(parent).children.remove(&name);
        Ok(self.free_subtree(id))
    }

    /// Removes the subtree at `path`. A missing path is a successful no-op,
    /// so whiteouts can be replayed against partial lower layers.
    pub fn remove_path(&mut self, path: &str) -> Result<usize, TreeError> {
        let parsed: NodePath = path
            .parse()
            .map_err(|source| TreeError::invalid_path(path, source))?;
        match self.resolve(&parsed) {
            Some(id) => self.remove(id),
            None => Ok(0),
        }
    }

    fn free_subtree(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes[id.index()].take() else {
            return 0;
        };
        self.free.push(id);
        self.size -= 1;
        if node.data.file_info.is_regular() {
            self.file_size -= node.data.file_info.size;
        }
        let mut count = 1;
        for (_name, child) in node.children {
            count += self.free_subtree(child);
        }
        count
    }

    /// The absolute path of a node: the `/`-join of ancestor names from the
    /// root. The root's path is `/`.
    pub fn path_of(&self, id: NodeId) -> NodePath {
        let mut names: Vec<PathComponent> = Vec::new();
        let mut current = Some(id);
        while let Some(cursor) = current {
            let node = self.get(cursor);
            if let Some(name) = &node.name {
                names.push(name.clone());
            }
            current = node.parent;
        }
        names.reverse();
        names.into_iter().collect()
    }

    /// Depth-first, child-first traversal in ascending name order. The
    /// visitor runs on a node only after all of its descendants; the root is
    /// never visited. A visitor error aborts the walk and is surfaced
    /// unchanged.
    ///
    /// The visitor may remove the node it is handed (or any already-visited
    /// descendant): each parent's child list is snapshotted by name before
    /// recursion and every name is re-resolved before use, so structural
    /// mutation during the walk is safe. Whether children added mid-walk are
    /// visited is unspecified.
    ///
    /// `evaluator` gates nodes: when it returns false for a node, neither
    /// the node nor its subtree is visited.
    pub fn visit_depth_child_first<E>(
        &mut self,
        visitor: &mut dyn FnMut(&mut FileTree, NodeId) -> Result<(), E>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> Result<(), E> {
        self.visit_children(self.root, visitor, evaluator)
    }

    fn visit_children<E>(
        &mut self,
        id: NodeId,
        visitor: &mut dyn FnMut(&mut FileTree, NodeId) -> Result<(), E>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> Result<(), E> {
        let names: Vec<PathComponent> = self.get(id).children.keys().cloned().collect();
        for name in names {
            // A previously visited sibling's visitor may have removed this
            // child in the meantime.
            let Some(child) = self.get(id).child(&name) else {
                continue;
            };
            if let Some(evaluator) = evaluator {
                if !evaluator(self, child) {
                    continue;
                }
            }
            self.visit_children(child, visitor, evaluator)?;
            let Some(child) = self.get(id).child(&name) else {
                continue;
            };
            visitor(self, child)?;
        }
        Ok(())
    }

    /// Deep copy: isomorphic in names, records, and view flags, sharing no
    /// state with the source. The copy gets a fresh [TreeId].
    pub fn copy(&self) -> FileTree {
        let mut copy = FileTree::new();
        copy.name = self.name.clone();
        copy.get_mut(copy.root).data = self.get(self.root).data.clone();
        let copy_root = copy.root;
        self.copy_children_into(self.root, &mut copy, copy_root);
        copy.size = self.size;
        copy.file_size = self.file_size;
        copy
    }

    fn copy_children_into(&self, from: NodeId, target: &mut FileTree, to: NodeId) {
        for (name, child_id) in self.get(from).children.iter() {
            let child = self.get(*child_id);
            let new_node = FileNode {
                name: Some(name.clone()),
                data: child.data.clone(),
                parent: Some(to),
                children: std::collections::BTreeMap::new(),
            };
            let new_id = target.alloc(new_node);
            target.get_mut(to).children.insert(name.clone(), new_id);
            self.copy_children_into(*child_id, target, new_id);
        }
    }
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}
