use tracing::{instrument, warn};

use crate::errors::{StackError, TreeError};
use crate::path::{PathComponent, PathError};

use super::{FileTree, NodeId};

impl FileTree {
    /// Applies `other` on top of `self`, mutating `self` into the effective
    /// filesystem of both layers.
    ///
    /// Whiteout entries are interpreted, not copied: a child named
    /// `.wh.<stem>` deletes `self`'s node at the sibling path `<stem>` (a
    /// no-op when the lower layer never had it). A malformed sentinel whose
    /// remainder names no deletable sibling (a bare `.wh.`, or a whiteout
    /// of `.` or `..`) fails the layer. Everything else is overwritten in
    /// place or created; directories merge by descent, so lower children
    /// survive unless explicitly whited out.
    #[instrument(skip_all, fields(lower = %self.id(), upper = %other.id()))]
    pub fn stack(&mut self, other: &FileTree) -> Result<(), TreeError> {
        self.overlay(other, other.root_id(), self.root_id())
    }

    fn overlay(
        &mut self,
        other: &FileTree,
        upper_id: NodeId,
        lower_id: NodeId,
    ) -> Result<(), TreeError> {
        let entries: Vec<(PathComponent, NodeId)> = other
            .get(upper_id)
            .children()
            .map(|(name, child)| (name.clone(), child))
            .collect();

        for (name, upper_child) in entries {
            if name.is_whiteout() {
                let stem = name.whiteout_stem().ok_or_else(|| {
                    TreeError::invalid_path(
                        &other.path_of(upper_child).to_string(),
                        PathError::BadWhiteoutTarget,
                    )
                })?;
                if let Some(victim) = self.get(lower_id).child(&stem) {
                    self.remove(victim)?;
                }
                continue;
            }

            let info = other.get(upper_child).file_info().clone();
            let lower_child = self.add_child(lower_id, name, info);
            self.overlay(other, upper_child, lower_child)?;
        }
        Ok(())
    }
}

/// Deep-copies `trees[start]` and stacks `trees[start + 1..=stop]` onto the
/// copy in order. Failing layers are reported, not fatal: the remaining
/// layers are still applied and the per-layer errors returned alongside the
/// result.
///
/// Panics if the range is out of bounds, like any slice indexing.
#[instrument(skip(trees))]
pub fn stack_range(trees: &[FileTree], start: usize, stop: usize) -> (FileTree, Vec<StackError>) {
    let mut stacked = trees[start].copy();
    let mut errors = Vec::new();

    for (layer_index, layer) in trees[..=stop].iter().enumerate().skip(start + 1) {
        if let Err(source) = stacked.stack(layer) {
            warn!(layer_index, %source, "failed to stack layer");
            errors.push(StackError {
                layer_index,
                source,
            });
        }
    }
    (stacked, errors)
}
