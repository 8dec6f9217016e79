/// Data model for the duscope scan tree.
///
/// Re-exports the arena-allocated tree, its nodes and the remote path type.
pub mod file_node;
pub mod file_tree;
pub mod path;
pub mod size;

pub use file_node::{FileNode, NodeIndex};
pub use file_tree::{FileTree, LARGEST_FILES_CAP};
pub use path::RemotePath;

/// A tree shared between the session and background workers.
///
/// The deletion coordinator holds the write lock for the whole mutation step
/// (unlink + ancestor recompute); readers take the read lock per access.
pub type SharedTree = std::sync::Arc<parking_lot::RwLock<FileTree>>;
