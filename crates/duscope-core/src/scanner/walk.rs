/// Depth-first tree walker over a [`FilesystemClient`].
///
/// The walk is a post-order traversal driven by an explicit stack of
/// directory frames, so recursion depth is bounded by the heap rather than
/// the thread stack:
///
/// 1. Entering a directory lists it once and appends one node per kept
///    child. File sizes are known immediately; subdirectories are queued in
///    the frame.
/// 2. The top frame's next queued subdirectory is entered.
/// 3. When a frame runs out of subdirectories every child is resolved, so
///    the directory's size is rolled up from its children and the frame
///    is popped.
///
/// Sizes therefore become final while the stack unwinds; no second
/// aggregation pass is needed.
use super::filter::NameFilter;
use super::progress::ScanProgress;
use super::ScanError;
use crate::fs::{ChildFailure, FilesystemClient, FsError, Listing};
use crate::model::{FileNode, FileTree, NodeIndex, RemotePath};
use compact_str::CompactString;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Minimum number of new entries between two `Update` messages.
pub const PROGRESS_INTERVAL: u64 = 64;

/// A directory whose subdirectories are still being visited.
struct Frame {
    dir: NodeIndex,
    pending: std::vec::IntoIter<(NodeIndex, RemotePath)>,
}

/// Running totals reported through `ScanProgress::Update`.
#[derive(Default)]
struct WalkStats {
    visited: u64,
    files_found: u64,
    dirs_found: u64,
    total_size: u64,
    /// Entries dropped for an invalid name.
    skipped: u64,
    last_reported: Option<u64>,
}

/// Everything the walk needs besides the tree it is building.
struct Walk<'a> {
    client: &'a dyn FilesystemClient,
    filter: &'a NameFilter,
    cancel_flag: &'a AtomicBool,
    progress_tx: &'a Sender<ScanProgress>,
    stats: WalkStats,
}

/// Scan `root_path` and return the aggregated tree.
///
/// Only a failure to list the root itself is fatal. Any other listing or
/// status failure becomes an inaccessible zero-sized leaf, is reported as
/// `ScanProgress::Error`, and the walk continues with its siblings.
///
/// The cancellation flag is polled before every listing call; once set, the
/// walk stops and returns [`ScanError::Cancelled`] without a tree.
pub fn scan_tree(
    client: &dyn FilesystemClient,
    root_path: &RemotePath,
    filter: &NameFilter,
    cancel_flag: &AtomicBool,
    progress_tx: &Sender<ScanProgress>,
) -> Result<FileTree, ScanError> {
    let start = Instant::now();
    let mut walk = Walk {
        client,
        filter,
        cancel_flag,
        progress_tx,
        stats: WalkStats {
            dirs_found: 1, // count the root
            ..WalkStats::default()
        },
    };
    let mut tree = FileTree::with_capacity(root_path.clone(), 4_096);
    let root = tree.root;

    walk.check_cancelled()?;
    let listing = client
        .list_children(root_path)
        .map_err(|source| ScanError::RootUnreadable {
            path: root_path.clone(),
            source,
        })?;
    walk.report(root_path, true);
    let subdirs = walk.populate(&mut tree, root, root_path, listing);

    let mut stack = vec![Frame {
        dir: root,
        pending: subdirs.into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        match frame.pending.next() {
            Some((dir, dir_path)) => {
                walk.check_cancelled()?;
                match client.list_children(&dir_path) {
                    Ok(listing) => {
                        walk.report(&dir_path, false);
                        let subdirs = walk.populate(&mut tree, dir, &dir_path, listing);
                        stack.push(Frame {
                            dir,
                            pending: subdirs.into_iter(),
                        });
                    }
                    Err(err) => {
                        // Leave it as an empty, zero-sized error leaf.
                        tree.nodes[dir.idx()].is_error = true;
                        walk.report_error(&dir_path, &err);
                    }
                }
            }
            None => {
                let dir = frame.dir;
                stack.pop();
                tree.roll_up(dir);
            }
        }
    }

    tree.finalize();

    debug!(
        "Scan of {} complete: {} files, {} dirs, {} invalid names skipped, {} bytes in {:?}",
        root_path,
        walk.stats.files_found,
        walk.stats.dirs_found,
        walk.stats.skipped,
        tree.total_size,
        start.elapsed()
    );

    Ok(tree)
}

impl Walk<'_> {
    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            info!("Scan cancelled after {} entries", self.stats.visited);
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    /// Append one node per kept child of `parent` and return the
    /// subdirectories still to visit, in listing order.
    fn populate(
        &mut self,
        tree: &mut FileTree,
        parent: NodeIndex,
        parent_path: &RemotePath,
        listing: Listing,
    ) -> Vec<(NodeIndex, RemotePath)> {
        let mut subdirs = Vec::new();
        let mut seen: HashSet<String> = HashSet::with_capacity(listing.len());

        for child in listing {
            let (name, kind) = match &child {
                Ok(status) => (status.name.as_str(), status.kind),
                Err(failure) => (failure.name.as_str(), failure.kind),
            };
            // A name like `..` would address another entry in the store.
            let Some(child_path) = parent_path.join(name) else {
                self.report_invalid_name(parent_path, name);
                continue;
            };
            if !self.filter.keeps(name, kind) {
                continue;
            }
            if !seen.insert(name.to_string()) {
                warn!("Duplicate entry {name:?} in listing of {parent_path}, keeping the first");
                continue;
            }

            let idx = match child {
                Ok(status) if status.kind.is_dir() => {
                    let mut node =
                        FileNode::new_dir(CompactString::new(&status.name), Some(parent));
                    node.modified = status.modified;
                    let idx = tree.add_node(node);
                    subdirs.push((idx, child_path));
                    self.stats.dirs_found += 1;
                    idx
                }
                Ok(status) => {
                    let mut node =
                        FileNode::new_file(CompactString::new(&status.name), status.size, Some(parent));
                    node.modified = status.modified;
                    self.stats.files_found += 1;
                    self.stats.total_size = self.stats.total_size.saturating_add(status.size);
                    tree.add_node(node)
                }
                Err(ChildFailure { name, kind, error }) => {
                    self.report_error(&child_path, &error);
                    tree.add_node(FileNode::new_error(
                        CompactString::new(&name),
                        kind.is_dir(),
                        Some(parent),
                    ))
                }
            };
            tree.add_child(parent, idx);
            self.stats.visited += 1;
        }

        subdirs
    }

    /// Send an `Update` if enough entries were created since the last one.
    fn report(&mut self, current: &RemotePath, force: bool) {
        let due = match self.stats.last_reported {
            None => true,
            Some(last) => self.stats.visited - last >= PROGRESS_INTERVAL,
        };
        if !(force || due) {
            return;
        }
        self.stats.last_reported = Some(self.stats.visited);
        let _ = self.progress_tx.send(ScanProgress::Update {
            current_path: current.to_string(),
            visited: self.stats.visited,
            files_found: self.stats.files_found,
            dirs_found: self.stats.dirs_found,
            total_size: self.stats.total_size,
        });
    }

    fn report_invalid_name(&mut self, parent: &RemotePath, name: &str) {
        warn!("Skipping entry {name:?} in {parent}: not a single path segment");
        self.stats.skipped += 1;
        let _ = self.progress_tx.send(ScanProgress::Error {
            path: parent.to_string(),
            message: format!("invalid entry name {name:?}"),
        });
    }

    fn report_error(&mut self, path: &RemotePath, err: &FsError) {
        warn!("Cannot read {path}: {err}");
        let _ = self.progress_tx.send(ScanProgress::Error {
            path: path.to_string(),
            message: err.to_string(),
        });
    }
}
