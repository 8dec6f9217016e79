//! Session state management.
//!
//! Centralises all mutable state a frontend reads and writes: the scan
//! lifecycle, the current folder, and deletions. Background workers
//! communicate via channels; state updates happen in
//! [`Session::process_scan_messages`] and [`Session::process_delete_messages`],
//! which the frontend calls from its own loop.
//!
//! The session exclusively owns the scanned tree. Only a completed scan
//! (wholesale replacement) and the deletion coordinator (one subtree at a
//! time, under the tree's write lock) change it.
use duscope_core::delete::{
    delete_entry, start_delete, ConfirmPermanent, DeleteError, DeleteHandle, DeleteOutcome,
};
use duscope_core::fs::FilesystemClient;
use duscope_core::model::{FileTree, NodeIndex, RemotePath, SharedTree};
use duscope_core::resolver::{resolve_path, ResolveError, ResolvedPath};
use duscope_core::scanner::progress::ScanProgress;
use duscope_core::scanner::{start_scan, NameFilter, ScanHandle};
use parking_lot::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{info, warn};

/// Maximum number of scan-progress messages drained per pump.
///
/// Prevents a backlog from blocking the frontend loop for a perceptible
/// duration.
pub const MAX_MESSAGES_PER_PUMP: usize = 300;

/// Maximum number of per-entry scan errors kept for display.
pub const MAX_SCAN_ERRORS: usize = 1_000;

/// The current phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No scan started yet.
    Idle,
    /// Scanning: live counters are updating.
    Scanning,
    /// Scan complete: results are available.
    Results,
    /// The last scan could not produce a tree (unreadable root or cancelled).
    Failed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a scan or deletion is already in progress")]
    Busy,
    #[error("no scan results available")]
    NoTree,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Delete(#[from] DeleteError),
    #[error("cannot start background worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// What happened to a scan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStart {
    /// Scan running on `root`; `corrected` if it differs from the request.
    Started { root: RemotePath, corrected: bool },
    /// The corrected root was rejected by the caller; nothing started.
    Declined { suggested: RemotePath },
}

/// One row of the current folder's listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub node_index: NodeIndex,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub percent_of_parent: f32,
    pub accessible: bool,
    pub modified: Option<SystemTime>,
}

/// All session state.
pub struct Session {
    client: Arc<dyn FilesystemClient>,

    // ── Scan ───────────────────────────────────────────
    pub phase: SessionPhase,
    scan_handle: Option<ScanHandle>,
    pub scan_visited: u64,
    pub scan_files_found: u64,
    pub scan_dirs_found: u64,
    pub scan_total_size: u64,
    pub scan_current_path: String,
    pub scan_error_count: u64,
    pub scan_duration: Option<Duration>,
    /// True if the most recent scan was cancelled.
    pub scan_was_cancelled: bool,
    /// Why the most recent scan produced no tree, if it failed.
    pub scan_failure: Option<String>,
    pub scan_errors: Vec<(String, String)>,

    // ── Results ────────────────────────────────────────
    tree: Option<SharedTree>,
    /// Directory currently shown.
    pub current_dir: Option<NodeIndex>,

    // ── Deletion ───────────────────────────────────────
    delete_handle: Option<DeleteHandle>,
}

impl Session {
    /// Create an idle session over `client`.
    pub fn new(client: Arc<dyn FilesystemClient>) -> Self {
        Self {
            client,
            phase: SessionPhase::Idle,
            scan_handle: None,
            scan_visited: 0,
            scan_files_found: 0,
            scan_dirs_found: 0,
            scan_total_size: 0,
            scan_current_path: String::new(),
            scan_error_count: 0,
            scan_duration: None,
            scan_was_cancelled: false,
            scan_failure: None,
            scan_errors: Vec::new(),
            tree: None,
            current_dir: None,
            delete_handle: None,
        }
    }

    /// Resolve a requested root to itself or its nearest existing ancestor.
    pub fn resolve(&self, requested: &RemotePath) -> Result<ResolvedPath, SessionError> {
        Ok(resolve_path(self.client.as_ref(), requested)?)
    }

    /// Resolve `requested` and start scanning it.
    ///
    /// When the path had to be corrected, `accept_correction` decides
    /// whether the nearest existing ancestor is scanned instead.
    pub fn resolve_and_scan(
        &mut self,
        requested: &RemotePath,
        filter: NameFilter,
        accept_correction: impl FnOnce(&ResolvedPath) -> bool,
    ) -> Result<ScanStart, SessionError> {
        let resolved = self.resolve(requested)?;
        if resolved.was_corrected && !accept_correction(&resolved) {
            info!("Corrected scan root {} declined", resolved.path);
            return Ok(ScanStart::Declined {
                suggested: resolved.path,
            });
        }
        self.start_scan(resolved.path.clone(), filter)?;
        Ok(ScanStart::Started {
            root: resolved.path,
            corrected: resolved.was_corrected,
        })
    }

    /// Start a scan of `root`, superseding any scan in flight.
    ///
    /// Refused while a deletion is running.
    pub fn start_scan(&mut self, root: RemotePath, filter: NameFilter) -> Result<(), SessionError> {
        if self.delete_handle.is_some() {
            return Err(SessionError::Busy);
        }
        if let Some(previous) = self.scan_handle.take() {
            info!("Superseding scan of {}", previous.root_path);
            previous.cancel();
        }

        self.phase = SessionPhase::Scanning;
        self.scan_visited = 0;
        self.scan_files_found = 0;
        self.scan_dirs_found = 0;
        self.scan_total_size = 0;
        self.scan_current_path = root.to_string();
        self.scan_error_count = 0;
        self.scan_duration = None;
        self.scan_was_cancelled = false;
        self.scan_failure = None;
        self.scan_errors.clear();
        self.tree = None;
        self.current_dir = None;

        match start_scan(self.client.clone(), root, filter) {
            Ok(handle) => {
                self.scan_handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.phase = SessionPhase::Failed;
                self.scan_failure = Some(err.to_string());
                Err(SessionError::Spawn(err))
            }
        }
    }

    /// Cancel any running scan.
    pub fn cancel_scan(&mut self) {
        if let Some(ref handle) = self.scan_handle {
            handle.cancel();
        }
    }

    /// `true` while a scan or deletion is in flight.
    pub fn is_busy(&self) -> bool {
        self.scan_handle.is_some() || self.delete_handle.is_some()
    }

    /// Process pending scan progress messages.
    ///
    /// Returns `true` if anything changed and the frontend should redraw.
    pub fn process_scan_messages(&mut self) -> bool {
        let Some(handle) = &self.scan_handle else {
            return false;
        };

        let mut changed = false;
        let mut terminal = None;
        for _ in 0..MAX_MESSAGES_PER_PUMP {
            let Ok(msg) = handle.progress_rx.try_recv() else {
                break;
            };
            changed = true;
            match msg {
                ScanProgress::Update {
                    current_path,
                    visited,
                    files_found,
                    dirs_found,
                    total_size,
                } => {
                    self.scan_current_path = current_path;
                    self.scan_visited = visited;
                    self.scan_files_found = files_found;
                    self.scan_dirs_found = dirs_found;
                    self.scan_total_size = total_size;
                }
                ScanProgress::Error { path, message } => {
                    self.scan_error_count += 1;
                    if self.scan_errors.len() < MAX_SCAN_ERRORS {
                        self.scan_errors.push((path, message));
                    }
                }
                other => {
                    terminal = Some(other);
                    break;
                }
            }
        }

        match terminal {
            Some(ScanProgress::Complete {
                tree,
                duration,
                error_count,
            }) => {
                self.scan_error_count = error_count;
                self.scan_duration = Some(duration);
                self.scan_total_size = tree.total_size;
                self.install_tree(*tree);
                self.phase = SessionPhase::Results;
                self.scan_handle = None;
            }
            Some(ScanProgress::Failed(err)) => {
                self.scan_failure = Some(err.to_string());
                self.phase = SessionPhase::Failed;
                self.scan_handle = None;
            }
            Some(ScanProgress::Cancelled) => {
                self.scan_was_cancelled = true;
                self.scan_failure = Some("scan cancelled".to_string());
                self.phase = SessionPhase::Failed;
                self.scan_handle = None;
            }
            _ => {}
        }

        changed
    }

    /// Pump scan messages until the scan ends or `timeout` elapses.
    ///
    /// Returns the phase reached.
    pub fn wait_for_scan(&mut self, timeout: Duration) -> SessionPhase {
        let deadline = std::time::Instant::now() + timeout;
        while self.scan_handle.is_some() && std::time::Instant::now() < deadline {
            if !self.process_scan_messages() {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        self.phase
    }

    fn install_tree(&mut self, tree: FileTree) {
        self.current_dir = Some(tree.root);
        self.tree = Some(Arc::new(RwLock::new(tree)));
    }

    /// The scanned tree, if a scan completed.
    pub fn tree(&self) -> Option<SharedTree> {
        self.tree.clone()
    }

    /// Show `dir` next. Returns `false` (and changes nothing) unless `dir`
    /// is an attached directory of the current tree.
    pub fn change_folder(&mut self, dir: NodeIndex) -> bool {
        let Some(tree) = &self.tree else {
            return false;
        };
        let ok = {
            let tree = tree.read();
            tree.is_attached(dir) && tree.node(dir).is_dir
        };
        if ok {
            self.current_dir = Some(dir);
        }
        ok
    }

    /// Show the parent of the current folder. `false` at the root.
    pub fn go_up(&mut self) -> bool {
        let parent = match (&self.tree, self.current_dir) {
            (Some(tree), Some(dir)) => tree.read().node(dir).parent,
            _ => None,
        };
        match parent {
            Some(p) => self.change_folder(p),
            None => false,
        }
    }

    /// Enter the child directory called `name` of the current folder.
    pub fn enter(&mut self, name: &str) -> bool {
        let child = match (&self.tree, self.current_dir) {
            (Some(tree), Some(dir)) => tree.read().child_by_name(dir, name),
            _ => None,
        };
        child.is_some_and(|c| self.change_folder(c))
    }

    /// Absolute path of the current folder.
    pub fn breadcrumb(&self) -> Option<RemotePath> {
        let tree = self.tree.as_ref()?;
        let dir = self.current_dir?;
        tree.read().full_path(dir)
    }

    /// Rows of the current folder, directories first, then by size.
    pub fn listing(&self) -> Vec<ListingRow> {
        let (Some(tree), Some(dir)) = (&self.tree, self.current_dir) else {
            return Vec::new();
        };
        let tree = tree.read();
        tree.children_sorted_by_size(dir)
            .into_iter()
            .map(|idx| {
                let node = tree.node(idx);
                ListingRow {
                    node_index: idx,
                    name: node.name.to_string(),
                    is_dir: node.is_dir,
                    size: node.size,
                    percent_of_parent: node.percent_of_parent,
                    accessible: node.is_accessible(),
                    modified: node.modified,
                }
            })
            .collect()
    }

    /// Delete `target` on the calling thread.
    ///
    /// `confirm` is asked only if the trash is unavailable. On success the
    /// session navigates to the deleted entry's former parent.
    pub fn delete_now(
        &mut self,
        target: NodeIndex,
        confirm: &dyn ConfirmPermanent,
    ) -> Result<DeleteOutcome, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let tree = self.tree.clone().ok_or(SessionError::NoTree)?;
        let outcome = delete_entry(
            self.client.as_ref(),
            &tree,
            target,
            confirm,
            &AtomicBool::new(false),
        )?;
        self.after_delete(&outcome);
        Ok(outcome)
    }

    /// Start deleting `target` on a background thread.
    ///
    /// Poll [`process_delete_messages`](Self::process_delete_messages) for
    /// the result.
    pub fn request_delete(
        &mut self,
        target: NodeIndex,
        confirm: Box<dyn ConfirmPermanent + Send>,
    ) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let tree = self.tree.clone().ok_or(SessionError::NoTree)?;
        let handle = start_delete(self.client.clone(), tree, target, confirm)?;
        self.delete_handle = Some(handle);
        Ok(())
    }

    /// Abort the pending deletion if it has not reached the store yet.
    pub fn cancel_delete(&mut self) {
        if let Some(ref handle) = self.delete_handle {
            handle.cancel();
        }
    }

    /// Collect the result of a background deletion, if it finished.
    pub fn process_delete_messages(&mut self) -> Option<Result<DeleteOutcome, DeleteError>> {
        let handle = self.delete_handle.as_ref()?;
        let result = match handle.result_rx.try_recv() {
            Ok(result) => result,
            Err(crossbeam_channel::TryRecvError::Empty) => return None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                warn!("Delete worker for {:?} exited without a result", handle.target);
                self.delete_handle = None;
                return Some(Err(DeleteError::WorkerLost));
            }
        };
        self.delete_handle = None;
        if let Ok(outcome) = &result {
            self.after_delete(outcome);
        }
        Some(result)
    }

    fn after_delete(&mut self, outcome: &DeleteOutcome) {
        if let Some(parent) = outcome.parent() {
            self.change_folder(parent);
        }
    }
}
