use std::fmt::{self, Display};

use tracing::instrument;

use crate::errors::TreeError;

use super::{FileTree, NodeId};

/// Per-node classification of the change between two trees, produced by
/// [FileTree::compare].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DiffType {
    #[default]
    Unchanged,
    Changed,
    Added,
    Removed,
}

impl DiffType {
    /// Folds two classifications into one, used to aggregate children into
    /// their parent: equal values keep themselves, any two distinct values
    /// make the parent `Changed`. Commutative and associative, with
    /// `Unchanged` as the identity of an untouched subtree.
    pub fn merge(self, other: DiffType) -> DiffType {
        if self == other {
            self
        } else {
            DiffType::Changed
        }
    }
}

impl Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiffType::Unchanged => "Unchanged",
            DiffType::Changed => "Changed",
            DiffType::Added => "Added",
            DiffType::Removed => "Removed",
        };
        f.write_str(name)
    }
}

impl FileTree {
    /// Sets the classification of `id` and every descendant, as when a
    /// whole subtree is added or whited out.
    pub fn assign_diff_type(&mut self, id: NodeId, diff_type: DiffType) {
        self.get_mut(id).data.diff_type = diff_type;
        let children: Vec<NodeId> = self.get(id).children().map(|(_, child)| child).collect();
        for child in children {
            self.assign_diff_type(child, diff_type);
        }
    }

    /// Folds `diff_type` into the node's current classification via
    /// [DiffType::merge].
    pub fn merge_diff_type(&mut self, id: NodeId, diff_type: DiffType) {
        let merged = self.get(id).data.diff_type.merge(diff_type);
        self.get_mut(id).data.diff_type = merged;
    }

    /// Annotates `self` (the lower tree) with the changes `upper` applies
    /// on top of it.
    ///
    /// Every node starts over as `Unchanged`. Whiteouts in `upper` mark the
    /// targeted lower subtree `Removed`; paths missing from `self` are
    /// grafted in and marked `Added`; present paths whose records differ
    /// become `Changed`. Each classification is folded into the pre-existing
    /// ancestors, so every change below a directory surfaces in the
    /// directory's own classification. Absence of a lower path in `upper` is
    /// not a removal: only explicit whiteouts remove.
    #[instrument(skip_all, fields(lower = %self.id(), upper = %upper.id()))]
    pub fn compare(&mut self, upper: &FileTree) -> Result<(), TreeError> {
        // Reset any classification a prior compare left behind.
        self.assign_diff_type(self.root_id(), DiffType::Unchanged);
        self.graft(upper, upper.root_id(), self.root_id());
        Ok(())
    }

    fn graft(&mut self, upper: &FileTree, upper_id: NodeId, lower_id: NodeId) {
        let entries: Vec<_> = upper
            .get(upper_id)
            .children()
            .map(|(name, child)| (name.clone(), child))
            .collect();

        for (name, upper_child) in entries {
            if name.is_whiteout() {
                // Unlike stack, compare tolerates malformed sentinels: its
                // only errors are visitor errors.
                let Some(stem) = name.whiteout_stem() else {
                    continue;
                };
                if let Some(victim) = self.get(lower_id).child(&stem) {
                    self.assign_diff_type(victim, DiffType::Removed);
                    self.bubble_changed(victim);
                }
                continue;
            }

            let upper_info = upper.get(upper_child).file_info().clone();
            match self.get(lower_id).child(&name) {
                Some(lower_child) => {
                    if !self.get(lower_child).file_info().content_matches(&upper_info) {
                        self.merge_diff_type(lower_child, DiffType::Changed);
                        self.bubble_changed(lower_child);
                    }
                    self.graft(upper, upper_child, lower_child);
                }
                None => {
                    let created = self.add_child(lower_id, name, upper_info);
                    self.get_mut(created).data.diff_type = DiffType::Added;
                    self.bubble_changed(created);
                    self.graft_added(upper, upper_child, created);
                }
            }
        }
    }

    /// Grafts the children of a freshly added upper subtree. Everything in
    /// here is `Added` and has no pre-existing ancestors to fold into;
    /// whiteouts target nothing below a node that did not exist.
    fn graft_added(&mut self, upper: &FileTree, upper_id: NodeId, lower_id: NodeId) {
        let entries: Vec<_> = upper
            .get(upper_id)
            .children()
            .map(|(name, child)| (name.clone(), child))
            .collect();

        for (name, upper_child) in entries {
            if name.is_whiteout() {
                continue;
            }
            let info = upper.get(upper_child).file_info().clone();
            let created = self.add_child(lower_id, name, info);
            self.get_mut(created).data.diff_type = DiffType::Added;
            self.graft_added(upper, upper_child, created);
        }
    }

    /// Folds `Changed` into every pre-existing ancestor of `id`, stopping
    /// below the root.
    fn bubble_changed(&mut self, id: NodeId) {
        let mut current = self.get(id).parent();
        while let Some(parent) = current {
            if parent == self.root_id() {
                break;
            }
            self.merge_diff_type(parent, DiffType::Changed);
            current = self.get(parent).parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::DiffType;
    use crate::errors::TreeError;
    use crate::fixtures::{altered_info, linked_info, linked_layer};
    use crate::tree::FileTree;

    #[rstest]
    #[case::identity(DiffType::Unchanged, DiffType::Unchanged, DiffType::Unchanged)]
    #[case::same_added(DiffType::Added, DiffType::Added, DiffType::Added)]
    #[case::same_removed(DiffType::Removed, DiffType::Removed, DiffType::Removed)]
    #[case::same_changed(DiffType::Changed, DiffType::Changed, DiffType::Changed)]
    #[case::mixed(DiffType::Unchanged, DiffType::Added, DiffType::Changed)]
    #[case::mixed_removal(DiffType::Added, DiffType::Removed, DiffType::Changed)]
    #[case::changed_wins(DiffType::Removed, DiffType::Changed, DiffType::Changed)]
    fn merge_table(#[case] a: DiffType, #[case] b: DiffType, #[case] expected: DiffType) {
        assert_eq!(expected, a.merge(b));
        assert_eq!(expected, b.merge(a), "merge must be commutative");
    }

    /// Collects the classification of every non-root node by path.
    fn diff_types_by_path(tree: &mut FileTree) -> Vec<(String, DiffType)> {
        let mut out = Vec::new();
        tree.visit_depth_child_first(
            &mut |tree, id| {
                out.push((tree.path_of(id).to_string(), tree.get(id).data.diff_type));
                Ok::<_, TreeError>(())
            },
            None,
        )
        .expect("must visit");
        out
    }

    fn assert_diff(tree: &mut FileTree, expectations: &[(&str, DiffType)]) {
        for (path, diff_type) in diff_types_by_path(tree) {
            let expected = expectations
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, d)| *d)
                .unwrap_or(DiffType::Unchanged);
            assert_eq!(
                expected, diff_type,
                "expected node at {path} to be {expected}, but it was {diff_type}"
            );
        }
    }

    #[test]
    fn compare_with_no_changes() {
        let paths = [
            "/etc",
            "/etc/sudoers",
            "/etc/hosts",
            "/usr/bin",
            "/usr/bin/bash",
            "/usr",
        ];
        let mut lower = linked_layer(&paths);
        let upper = linked_layer(&paths);

        lower.compare(&upper).expect("must compare");
        assert_diff(&mut lower, &[]);
    }

    #[test]
    fn compare_with_adds() {
        let mut lower = linked_layer(&["/etc", "/etc/sudoers", "/usr", "/etc/hosts", "/usr/bin"]);
        let upper = linked_layer(&[
            "/etc",
            "/etc/sudoers",
            "/usr",
            "/etc/hosts",
            "/usr/bin",
            "/usr/bin/bash",
        ]);

        lower.compare(&upper).expect("must compare");
        assert_diff(
            &mut lower,
            &[
                ("/usr/bin/bash", DiffType::Added),
                ("/usr/bin", DiffType::Changed),
                ("/usr", DiffType::Changed),
            ],
        );
    }

    #[test]
    fn compare_with_changes() {
        let paths = ["/etc", "/usr", "/etc/hosts", "/etc/sudoers", "/usr/bin"];
        let mut lower = linked_layer(&paths);
        let mut upper = FileTree::new();
        for path in paths {
            upper.add_path(path, altered_info(path)).expect("must add");
        }

        lower.compare(&upper).expect("must compare");
        assert_diff(
            &mut lower,
            &[
                ("/etc", DiffType::Changed),
                ("/usr", DiffType::Changed),
                ("/etc/hosts", DiffType::Changed),
                ("/etc/sudoers", DiffType::Changed),
                ("/usr/bin", DiffType::Changed),
            ],
        );
    }

    #[test]
    fn compare_with_removes() {
        let mut lower = linked_layer(&[
            "/etc",
            "/usr",
            "/etc/hosts",
            "/etc/sudoers",
            "/usr/bin",
            "/root",
            "/root/example",
            "/root/example/some1",
            "/root/example/some2",
        ]);
        let upper = linked_layer(&["/.wh.etc", "/usr", "/usr/.wh.bin", "/root/.wh.example"]);

        lower.compare(&upper).expect("must compare");
        assert_diff(
            &mut lower,
            &[
                ("/etc", DiffType::Removed),
                ("/etc/hosts", DiffType::Removed),
                ("/etc/sudoers", DiffType::Removed),
                ("/usr/bin", DiffType::Removed),
                ("/root/example", DiffType::Removed),
                ("/root/example/some1", DiffType::Removed),
                ("/root/example/some2", DiffType::Removed),
                ("/usr", DiffType::Changed),
                ("/root", DiffType::Changed),
                // Whiteout entries themselves are never grafted into the
                // lower tree; only their targets are classified.
            ],
        );
        assert!(lower.get_node("/.wh.etc").is_err());
    }

    #[test]
    fn compare_tolerates_malformed_whiteouts() {
        let mut lower = linked_layer(&["/etc"]);
        let upper = linked_layer(&["/.wh."]);

        lower.compare(&upper).expect("must compare");
        assert_diff(&mut lower, &[]);
    }

    #[test]
    fn compare_grafts_missing_subtrees_as_added() {
        let mut lower = linked_layer(&["/usr"]);
        let upper = linked_layer(&["/usr", "/opt/tool/bin/run"]);

        lower.compare(&upper).expect("must compare");
        assert_diff(
            &mut lower,
            &[
                ("/opt", DiffType::Added),
                ("/opt/tool", DiffType::Added),
                ("/opt/tool/bin", DiffType::Added),
                ("/opt/tool/bin/run", DiffType::Added),
            ],
        );
    }

    #[test]
    fn compare_resets_previous_classification() {
        let mut lower = linked_layer(&["/etc", "/etc/hosts"]);
        let upper_changed = {
            let mut tree = FileTree::new();
            tree.add_path("/etc", linked_info("/etc")).expect("must add");
            tree.add_path("/etc/hosts", altered_info("/etc/hosts"))
                .expect("must add");
            tree
        };
        let upper_same = linked_layer(&["/etc", "/etc/hosts"]);

        lower.compare(&upper_changed).expect("must compare");
        assert_diff(
            &mut lower,
            &[
                ("/etc", DiffType::Changed),
                ("/etc/hosts", DiffType::Changed),
            ],
        );

        // A second compare against an identical upper starts from scratch.
        lower.compare(&upper_same).expect("must compare");
        assert_diff(&mut lower, &[]);
    }

    /// Parent aggregation: a classification anywhere below a directory
    /// always surfaces in the directory's own classification, and a removed
    /// subtree is removed wholesale.
    #[test]
    fn parent_aggregation_holds() {
        let mut lower = linked_layer(&[
            "/etc",
            "/usr",
            "/etc/hosts",
            "/etc/sudoers",
            "/usr/bin",
            "/root",
            "/root/example",
            "/root/example/some1",
            "/root/example/some2",
        ]);
        let upper = linked_layer(&[
            "/.wh.etc",
            "/usr",
            "/usr/.wh.bin",
            "/root/.wh.example",
            "/srv/data",
        ]);

        lower.compare(&upper).expect("must compare");

        lower
            .visit_depth_child_first(
                &mut |tree, id| {
                    let diff_type = tree.get(id).data.diff_type;

                    if diff_type != DiffType::Unchanged {
                        let mut current = tree.get(id).parent();
                        while let Some(parent) = current {
                            if parent == tree.root_id() {
                                break;
                            }
                            assert_ne!(
                                DiffType::Unchanged,
                                tree.get(parent).data.diff_type,
                                "change below {} did not surface",
                                tree.path_of(parent)
                            );
                            current = tree.get(parent).parent();
                        }
                    }

                    if diff_type == DiffType::Removed {
                        let children: Vec<_> =
                            tree.get(id).children().map(|(_, child)| child).collect();
                        for child in children {
                            assert_eq!(DiffType::Removed, tree.get(child).data.diff_type);
                        }
                    }
                    Ok::<_, TreeError>(())
                },
                None,
            )
            .expect("must visit");
    }
}
