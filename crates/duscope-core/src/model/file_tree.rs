/// Arena-backed scan tree with bottom-up size aggregation.
///
/// All nodes live in a single `Vec<FileNode>`. Relationships between nodes
/// use `NodeIndex` (a thin `u32` wrapper) rather than heap pointers, so the
/// parent back-reference never creates an ownership cycle.
///
/// The tree is built wholesale by one scan, mutated only by the deletion
/// coordinator (one subtree removed, then every ancestor recomputed), and
/// replaced wholesale by the next scan.
use super::file_node::{FileNode, NodeIndex};
use super::path::RemotePath;
use compact_str::CompactString;

/// How many entries the largest-files index keeps.
pub const LARGEST_FILES_CAP: usize = 100;

/// The complete tree produced by a scan.
#[derive(Debug, Clone)]
pub struct FileTree {
    /// Arena: every node ever inserted, including detached ones.
    pub nodes: Vec<FileNode>,

    /// The search root. Always index 0, never detached.
    pub root: NodeIndex,

    /// Absolute path of the search root in the remote store.
    pub root_path: RemotePath,

    /// Aggregate size of the root.
    pub total_size: u64,

    /// Indices of the N largest individual files, sorted descending by size.
    pub largest_files: Vec<NodeIndex>,

    /// Number of nodes still reachable from the root.
    live_nodes: usize,
}

impl FileTree {
    /// Create a tree holding only the search root for `root_path`.
    pub fn new(root_path: RemotePath) -> Self {
        Self::with_capacity(root_path, 16)
    }

    /// Create a tree with pre-allocated arena capacity.
    pub fn with_capacity(root_path: RemotePath, estimated_nodes: usize) -> Self {
        let name = root_display_name(&root_path);
        let mut nodes = Vec::with_capacity(estimated_nodes.max(1));
        nodes.push(FileNode::new_dir(CompactString::new(name), None));
        Self {
            nodes,
            root: NodeIndex(0),
            root_path,
            total_size: 0,
            largest_files: Vec::new(),
            live_nodes: 1,
        }
    }

    /// Allocate a new node in the arena and return its index.
    ///
    /// The node is not reachable until it is linked with [`add_child`](Self::add_child).
    pub fn add_node(&mut self, node: FileNode) -> NodeIndex {
        let idx = NodeIndex::new(self.nodes.len());
        self.nodes.push(node);
        self.live_nodes += 1;
        idx
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// O(1) thanks to the `last_child` link; listing order is preserved.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.nodes[child.idx()].parent = Some(parent);
        self.nodes[child.idx()].next_sibling = None;
        match self.nodes[parent.idx()].last_child {
            Some(last) => self.nodes[last.idx()].next_sibling = Some(child),
            None => self.nodes[parent.idx()].first_child = Some(child),
        }
        self.nodes[parent.idx()].last_child = Some(child);
    }

    /// `true` if `index` is the search root.
    #[inline]
    pub fn is_root(&self, index: NodeIndex) -> bool {
        index == self.root
    }

    /// `true` if `index` refers to a node that is still part of the tree.
    #[inline]
    pub fn is_attached(&self, index: NodeIndex) -> bool {
        self.nodes
            .get(index.idx())
            .is_some_and(|node| !node.detached)
    }

    /// Recompute every directory size and descendant count in one pass.
    ///
    /// Children are always inserted after their parent in the arena, so
    /// iterating in *reverse* processes every child before its parent.
    /// Safe to call repeatedly: directory values are reset first.
    pub fn aggregate_sizes(&mut self) {
        for node in self.nodes.iter_mut() {
            if node.is_dir {
                node.size = 0;
                node.descendant_count = 0;
            }
        }

        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            if node.detached {
                continue;
            }
            let (size, count) = if node.is_dir {
                (node.size, node.descendant_count)
            } else {
                (node.size, 1)
            };
            if let Some(parent_idx) = node.parent {
                let parent = &mut self.nodes[parent_idx.idx()];
                parent.size = parent.size.saturating_add(size);
                parent.descendant_count += count;
            }
        }

        self.finalize();
    }

    /// Compute percentages, the total and the largest-files index.
    ///
    /// Assumes directory sizes are already correct, as they are straight
    /// after a scan (the scanner assigns them while unwinding).
    pub fn finalize(&mut self) {
        for i in 0..self.nodes.len() {
            if self.nodes[i].detached {
                continue;
            }
            self.nodes[i].percent_of_parent = self.percent_of(NodeIndex::new(i));
        }
        self.total_size = self.nodes[self.root.idx()].size;
        self.compute_largest_files(LARGEST_FILES_CAP);
    }

    fn percent_of(&self, index: NodeIndex) -> f32 {
        let node = &self.nodes[index.idx()];
        // Roots use their own size as denominator.
        let parent_size = node
            .parent
            .map(|p| self.nodes[p.idx()].size)
            .unwrap_or(node.size);
        if parent_size > 0 {
            (node.size as f64 / parent_size as f64 * 100.0) as f32
        } else {
            0.0
        }
    }

    /// Find the N largest individual files by size.
    ///
    /// Uses `select_nth_unstable_by` to bring the top-N elements to the
    /// front, then sorts only those.
    fn compute_largest_files(&mut self, n: usize) {
        if n == 0 {
            self.largest_files.clear();
            return;
        }

        let mut file_indices: Vec<NodeIndex> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_dir && !node.detached && !node.is_error)
            .map(|(i, _)| NodeIndex::new(i))
            .collect();

        let by_size_desc =
            |a: &NodeIndex, b: &NodeIndex| self.nodes[b.idx()].size.cmp(&self.nodes[a.idx()].size);

        if file_indices.len() > n {
            file_indices.select_nth_unstable_by(n - 1, by_size_desc);
            file_indices.truncate(n);
        }
        file_indices.sort_unstable_by(by_size_desc);

        self.largest_files = file_indices;
    }

    /// Unlink `index` and its whole subtree from the tree.
    ///
    /// Returns the aggregate size that was removed, or `None` when `index`
    /// is the root or already detached. Ancestor sizes are NOT updated here;
    /// call [`recompute_ancestors`](Self::recompute_ancestors) with the former
    /// parent afterwards.
    pub fn remove_subtree(&mut self, index: NodeIndex) -> Option<u64> {
        if self.is_root(index) || !self.is_attached(index) {
            return None;
        }
        let parent = self.nodes[index.idx()].parent?;

        // Unlink from the parent's sibling list.
        let next = self.nodes[index.idx()].next_sibling;
        let mut prev: Option<NodeIndex> = None;
        let mut cursor = self.nodes[parent.idx()].first_child;
        while let Some(c) = cursor {
            if c == index {
                break;
            }
            prev = Some(c);
            cursor = self.nodes[c.idx()].next_sibling;
        }
        match prev {
            Some(p) => self.nodes[p.idx()].next_sibling = next,
            None => self.nodes[parent.idx()].first_child = next,
        }
        if self.nodes[parent.idx()].last_child == Some(index) {
            self.nodes[parent.idx()].last_child = prev;
        }

        let removed = self.nodes[index.idx()].size;

        // Tombstone the subtree.
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.idx()];
            node.detached = true;
            node.next_sibling = if current == index {
                None
            } else {
                node.next_sibling
            };
            self.live_nodes -= 1;
            let mut child = self.nodes[current.idx()].first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c.idx()].next_sibling;
            }
        }

        let nodes = &self.nodes;
        self.largest_files.retain(|idx| !nodes[idx.idx()].detached);

        Some(removed)
    }

    /// Set a directory's size and descendant count from its direct children.
    ///
    /// Inaccessible directories have no children and therefore stay at 0.
    pub fn roll_up(&mut self, dir: NodeIndex) {
        let mut size = 0u64;
        let mut count = 0u64;
        let mut child = self.nodes[dir.idx()].first_child;
        while let Some(c) = child {
            let node = &self.nodes[c.idx()];
            size = size.saturating_add(node.size);
            count += if node.is_dir { node.descendant_count } else { 1 };
            child = node.next_sibling;
        }
        let node = &mut self.nodes[dir.idx()];
        node.size = size;
        node.descendant_count = count;
    }

    /// Number of attached nodes that could not be read.
    pub fn error_count(&self) -> u64 {
        self.nodes
            .iter()
            .filter(|n| n.is_error && !n.detached)
            .count() as u64
    }

    /// Recompute size, descendant count and percentages for `start` and
    /// every ancestor up to the root, from their direct children.
    pub fn recompute_ancestors(&mut self, start: NodeIndex) {
        let mut current = Some(start);
        while let Some(dir) = current {
            self.roll_up(dir);
            current = self.nodes[dir.idx()].parent;
        }

        // Percentages shift for every child of every touched directory.
        let mut current = Some(start);
        while let Some(dir) = current {
            for child in self.children(dir) {
                self.nodes[child.idx()].percent_of_parent = self.percent_of(child);
            }
            self.nodes[dir.idx()].percent_of_parent = self.percent_of(dir);
            current = self.nodes[dir.idx()].parent;
        }

        self.total_size = self.nodes[self.root.idx()].size;
    }

    /// Return the first directory whose size differs from the sum of its
    /// children, if any.
    pub fn find_aggregate_mismatch(&self) -> Option<NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex::new).find(|&idx| {
            let node = &self.nodes[idx.idx()];
            if node.detached || !node.is_dir {
                return false;
            }
            let sum: u64 = self
                .children(idx)
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(self.nodes[c.idx()].size));
            sum != node.size || (node.is_error && (node.size != 0 || node.first_child.is_some()))
        })
    }

    /// Reconstruct the absolute path for a node by walking up to the root.
    ///
    /// `None` if any name on the way is not a single path segment; such a
    /// node has no address in the store.
    pub fn full_path(&self, index: NodeIndex) -> Option<RemotePath> {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            if self.is_root(idx) {
                break;
            }
            segments.push(self.nodes[idx.idx()].name.as_str());
            current = self.nodes[idx.idx()].parent;
        }
        segments
            .iter()
            .rev()
            .try_fold(self.root_path.clone(), |path, name| path.join(name))
    }

    /// Get direct children of a node, sorted directories first, then by size descending.
    pub fn children_sorted_by_size(&self, parent: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.children(parent);
        children.sort_by(|a, b| {
            let a_node = &self.nodes[a.idx()];
            let b_node = &self.nodes[b.idx()];
            b_node
                .is_dir
                .cmp(&a_node.is_dir)
                .then(b_node.size.cmp(&a_node.size))
        });
        children
    }

    /// Get direct children of a node in listing order.
    pub fn children(&self, parent: NodeIndex) -> Vec<NodeIndex> {
        let mut children = Vec::new();
        let mut child = self.nodes[parent.idx()].first_child;
        while let Some(idx) = child {
            children.push(idx);
            child = self.nodes[idx.idx()].next_sibling;
        }
        children
    }

    /// Find a direct child by name.
    pub fn child_by_name(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.children(parent)
            .into_iter()
            .find(|c| self.nodes[c.idx()].name == name)
    }

    /// Get the node at the given index.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &FileNode {
        &self.nodes[index.idx()]
    }

    /// Number of nodes reachable from the root (the root included).
    #[inline]
    pub fn len(&self) -> usize {
        self.live_nodes
    }

    /// Always `false`: the root exists for as long as the tree does.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_nodes == 0
    }
}

/// Derive a display name for the search root.
fn root_display_name(path: &RemotePath) -> String {
    match path.file_name() {
        Some(name) => name.to_string(),
        None => path.to_string(),
    }
}
