/// Top-N largest files analysis.
///
/// Reads the `largest_files` index the tree maintains on finalisation and
/// after every deletion, and enriches it with full remote paths.
use crate::model::{FileTree, NodeIndex, RemotePath};

/// A single entry in the "largest files" results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargestFile {
    /// Index into the tree arena.
    pub index: NodeIndex,
    /// Full path (reconstructed).
    pub path: RemotePath,
    /// File size in bytes.
    pub size: u64,
}

/// Get the top N largest files from the tree.
pub fn top_files(tree: &FileTree, n: usize) -> Vec<LargestFile> {
    tree.largest_files
        .iter()
        .filter(|&&idx| tree.is_attached(idx))
        .filter_map(|&idx| {
            Some(LargestFile {
                index: idx,
                path: tree.full_path(idx)?,
                size: tree.node(idx).size,
            })
        })
        .take(n)
        .collect()
}
