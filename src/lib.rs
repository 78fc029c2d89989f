//! Layered filesystem tree engine: one [FileTree] per image layer, stacking
//! with whiteout semantics, structural diff, and wasted-space accounting.
mod digests;
mod errors;
mod fileinfo;

pub mod fixtures;

mod path;
pub use path::{NameError, NodePath, PathComponent, PathError};

mod tree;
pub use tree::*;

pub use digests::{Md5Digest, MD5_LEN};
pub use errors::{StackError, TreeError};
pub use fileinfo::{type_flags, FileInfo};
