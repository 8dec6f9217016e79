/// Scanner module: orchestrates background tree scans.
///
/// [`walk::scan_tree`] is the pure scan: (client, root, filter, cancellation
/// flag, progress sender) in, tree or error out. [`start_scan`] runs it on a
/// dedicated thread and turns its result into the terminal message of the
/// progress stream, so a session can poll one channel for everything.
pub mod filter;
pub mod progress;
pub mod walk;

pub use filter::{FilterError, NameFilter};
pub use walk::{scan_tree, PROGRESS_INTERVAL};

use crate::fs::{FilesystemClient, FsError};
use crate::model::RemotePath;
use crossbeam_channel::Receiver;
use progress::ScanProgress;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Maximum number of progress messages that may queue up in the channel.
///
/// The session drains this channel on every pump. If it falls behind, the
/// scanner blocks briefly on `send` rather than consuming unbounded heap.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Listing the scan root failed; nothing could be scanned.
    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: RemotePath,
        #[source]
        source: FsError,
    },

    /// The scan was cancelled before it finished.
    #[error("scan cancelled")]
    Cancelled,
}

/// Handle to a running or completed scan. Allows cancellation and
/// receiving progress updates.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    /// Path being scanned.
    pub root_path: RemotePath,
    /// Flag to request cancellation.
    cancel_flag: Arc<AtomicBool>,
    /// Join handle for the scan thread.
    _thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Start a new scan on a background thread.
///
/// Returns a `ScanHandle` for receiving progress and requesting
/// cancellation. The stream always ends with `Complete`, `Failed` or
/// `Cancelled`.
pub fn start_scan(
    client: Arc<dyn FilesystemClient>,
    root_path: RemotePath,
    filter: NameFilter,
) -> std::io::Result<ScanHandle> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();
    let thread_root = root_path.clone();

    let thread = thread::Builder::new()
        .name("duscope-scanner".into())
        .spawn(move || {
            info!("Starting scan of {thread_root}");
            let start = Instant::now();

            let terminal = match scan_tree(
                client.as_ref(),
                &thread_root,
                &filter,
                &cancel_clone,
                &progress_tx,
            ) {
                Ok(tree) => {
                    let error_count = tree.error_count();
                    info!(
                        "Scan of {thread_root} finished: {} entries, {error_count} unreadable",
                        tree.len()
                    );
                    ScanProgress::Complete {
                        tree: Box::new(tree),
                        duration: start.elapsed(),
                        error_count,
                    }
                }
                Err(ScanError::Cancelled) => ScanProgress::Cancelled,
                Err(err) => {
                    error!("Scan of {thread_root} failed: {err}");
                    ScanProgress::Failed(err)
                }
            };
            let _ = progress_tx.send(terminal);
        })?;

    Ok(ScanHandle {
        progress_rx,
        root_path,
        cancel_flag,
        _thread: Some(thread),
    })
}
