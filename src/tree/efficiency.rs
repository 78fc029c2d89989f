use std::collections::BTreeMap;

use crate::path::NodePath;

use super::{FileTree, NodeId};

/// Counts, per full path, how often the path was written across the layer
/// sequence. Only leaf nodes that are regular files count; directories and
/// whiteout sentinels are not writes.
pub fn efficiency_map(trees: &[FileTree]) -> BTreeMap<NodePath, u64> {
    let mut map = BTreeMap::new();
    for tree in trees {
        count_file_writes(tree, tree.root_id(), &mut map);
    }
    map
}

fn count_file_writes(tree: &FileTree, id: NodeId, map: &mut BTreeMap<NodePath, u64>) {
    for (_name, child) in tree.get(id).children() {
        let node = tree.get(child);
        if !node.is_leaf() {
            count_file_writes(tree, child, map);
        } else if !node.is_whiteout() && node.file_info().is_regular() {
            *map.entry(tree.path_of(child)).or_insert(0) += 1;
        }
    }
}

/// The ratio of distinct paths to total writes across the layer sequence.
/// `1.0` means every file was written exactly once; lower scores mean more
/// redundant overwrites. A sequence with no file writes at all scores
/// `1.0`.
pub fn efficiency_score(trees: &[FileTree]) -> f64 {
    let map = efficiency_map(trees);
    let total: u64 = map.values().sum();
    if total == 0 {
        return 1.0;
    }
    map.len() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::{efficiency_map, efficiency_score};
    use crate::fixtures::regular_layer;
    use crate::path::NodePath;
    use crate::tree::FileTree;

    fn nginx_layers(count: usize) -> Vec<FileTree> {
        (0..count)
            .map(|_| regular_layer(&["/etc/nginx/nginx.conf", "/etc/nginx/public"]))
            .collect()
    }

    #[test]
    fn map_counts_repeated_writes() {
        let trees = nginx_layers(3);
        let map = efficiency_map(&trees);

        let expected: Vec<(NodePath, u64)> = vec![
            ("/etc/nginx/nginx.conf".parse().unwrap(), 3),
            ("/etc/nginx/public".parse().unwrap(), 3),
        ];
        assert_eq!(expected, map.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn map_skips_directories_and_whiteouts() {
        let mut tree = regular_layer(&["/etc/hosts"]);
        tree.add_path("/var/run/.wh.bashful", Default::default())
            .expect("must add");

        let map = efficiency_map(std::slice::from_ref(&tree));
        assert_eq!(1, map.len());
        assert!(map.contains_key(&"/etc/hosts".parse::<NodePath>().unwrap()));
    }

    #[test]
    fn score_penalizes_redundant_writes() {
        let trees = nginx_layers(3);
        let expected = 2.0 / 6.0;
        assert!((efficiency_score(&trees) - expected).abs() < 0.0001);
    }

    #[test]
    fn score_is_one_for_a_single_layer() {
        let trees = nginx_layers(1);
        assert!((efficiency_score(&trees) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn score_is_one_without_writes() {
        assert_eq!(1.0, efficiency_score(&[]));

        let empty = FileTree::new();
        assert_eq!(1.0, efficiency_score(std::slice::from_ref(&empty)));
    }
}
