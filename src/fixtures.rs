//! Canned records and layer trees shared across the test modules.
use lazy_static::lazy_static;

use crate::digests::Md5Digest;
use crate::fileinfo::{type_flags, FileInfo};
use crate::tree::FileTree;

lazy_static! {
    /// A digest distinct from the zero sentinel, for records that must
    /// compare as changed content.
    pub static ref ALTERED_MD5: Md5Digest =
        Md5Digest::from([1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
}

/// A zero-initialized regular-file record carrying its own path.
pub fn regular_info(path: &str) -> FileInfo {
    FileInfo {
        path: path.to_string(),
        ..FileInfo::default()
    }
}

/// A hard-link record with the zero digest.
pub fn linked_info(path: &str) -> FileInfo {
    FileInfo {
        path: path.to_string(),
        type_flag: type_flags::LINK,
        ..FileInfo::default()
    }
}

/// Like [linked_info], but with a different content digest.
pub fn altered_info(path: &str) -> FileInfo {
    FileInfo {
        md5: *ALTERED_MD5,
        ..linked_info(path)
    }
}

/// A layer whose entries are all [regular_info] records.
pub fn regular_layer(paths: &[&str]) -> FileTree {
    let mut tree = FileTree::new();
    for path in paths {
        tree.add_path(path, regular_info(path))
            .expect("fixture path must be valid");
    }
    tree
}

/// A layer whose entries are all [linked_info] records.
pub fn linked_layer(paths: &[&str]) -> FileTree {
    let mut tree = FileTree::new();
    for path in paths {
        tree.add_path(path, linked_info(path))
            .expect("fixture path must be valid");
    }
    tree
}
