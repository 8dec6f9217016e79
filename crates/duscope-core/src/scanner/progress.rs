/// Scan progress reporting: messages sent from the scan thread to the
/// session via a crossbeam channel.
///
/// The stream is finite: any number of `Update`/`Error` messages followed by
/// exactly one terminal message (`Complete`, `Failed` or `Cancelled`).
use super::ScanError;
use crate::model::FileTree;
use std::time::Duration;

#[derive(Debug)]
pub enum ScanProgress {
    /// Periodic update with running totals.
    Update {
        /// Directory currently being listed.
        current_path: String,
        /// Entries created so far (files, directories and error nodes).
        visited: u64,
        files_found: u64,
        dirs_found: u64,
        total_size: u64,
    },
    /// A non-fatal error (e.g. permission denied on one directory).
    /// The entry is in the tree, marked inaccessible.
    Error { path: String, message: String },
    /// Scanning completed. Carries the finished, aggregated tree.
    Complete {
        tree: Box<FileTree>,
        duration: Duration,
        error_count: u64,
    },
    /// The scan could not run (e.g. the root is unreadable).
    Failed(ScanError),
    /// Scan was cancelled; no tree is produced.
    Cancelled,
}

impl ScanProgress {
    /// `true` for the message that ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanProgress::Complete { .. } | ScanProgress::Failed(_) | ScanProgress::Cancelled
        )
    }
}
