/// A single node in the arena-allocated scan tree.
///
/// Nodes are stored in a flat `Vec<FileNode>` owned by [`FileTree`].
/// Parent-child relationships use indices rather than pointers: ownership
/// flows strictly downward through the arena, and the `parent` link is a
/// plain index used only for navigation and ancestor recomputation.
///
/// [`FileTree`]: super::FileTree
use compact_str::CompactString;
use std::time::SystemTime;

/// Lightweight index into the arena `Vec<FileNode>`.
///
/// Uses `u32` to keep nodes small: supports up to ~4 billion nodes,
/// which is more than enough for any real directory listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Create a new `NodeIndex` from a `usize`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A single file or directory in the tree.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// File or directory name only (NOT the full path).
    /// Full paths are reconstructed on-demand by walking up via `parent`.
    pub name: CompactString,

    /// Aggregate size in bytes.
    /// For files this is the file's own size. For directories it is the sum
    /// of the direct children's `size`, assigned when the scanner finishes
    /// the directory and recomputed after every deletion below it.
    pub size: u64,

    /// `true` if this node represents a directory.
    pub is_dir: bool,

    /// Index of the parent node. `None` only for the search root.
    pub parent: Option<NodeIndex>,

    /// First child (directories only). Children form a singly-linked list
    /// via [`next_sibling`](Self::next_sibling), in listing order.
    pub first_child: Option<NodeIndex>,

    /// Last child, kept so appends stay O(1).
    pub last_child: Option<NodeIndex>,

    /// Next sibling under the same parent.
    pub next_sibling: Option<NodeIndex>,

    /// Total number of descendant *files* (not directories).
    pub descendant_count: u64,

    /// Last-modified timestamp as reported by the filesystem client.
    pub modified: Option<SystemTime>,

    /// Pre-computed percentage of the parent's size (0.0–100.0).
    pub percent_of_parent: f32,

    /// `true` if this node could not be read (listing or status failed).
    /// The node stays in the tree as a zero-sized leaf so users can see
    /// where errors occurred.
    pub is_error: bool,

    /// `true` once the node has been unlinked by a deletion.
    /// Arena slots are never reused; detached nodes are simply unreachable.
    pub detached: bool,
}

impl FileNode {
    /// Create a new file node with the given name and size.
    pub fn new_file(name: CompactString, size: u64, parent: Option<NodeIndex>) -> Self {
        Self {
            name,
            size,
            is_dir: false,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            descendant_count: 0,
            modified: None,
            percent_of_parent: 0.0,
            is_error: false,
            detached: false,
        }
    }

    /// Create a new directory node.
    pub fn new_dir(name: CompactString, parent: Option<NodeIndex>) -> Self {
        Self {
            is_dir: true,
            size: 0,
            ..Self::new_file(name, 0, parent)
        }
    }

    /// Create an error placeholder node (e.g. permission-denied directory).
    pub fn new_error(name: CompactString, is_dir: bool, parent: Option<NodeIndex>) -> Self {
        Self {
            is_dir,
            is_error: true,
            ..Self::new_file(name, 0, parent)
        }
    }

    /// Bytes this node contributes on its own: the file size for files,
    /// always 0 for directories.
    #[inline]
    pub fn self_size(&self) -> u64 {
        if self.is_dir {
            0
        } else {
            self.size
        }
    }

    /// `false` for nodes whose contents could not be read during the scan.
    #[inline]
    pub fn is_accessible(&self) -> bool {
        !self.is_error
    }
}
