/// Deletion coordinator: trash first, permanent removal as a confirmed fallback.
///
/// Per attempt:
///
/// ```text
/// Guard -> TrashAttempt -> Done
///               |-> trash unavailable -> AwaitConfirmation
///                                 |-> declined  -> Aborted (tree unchanged)
///                                 |-> confirmed -> PermanentAttempt -> Done
///                                                        |-> failed -> Failed
/// ```
///
/// The tree is only mutated after the store confirmed the removal, and the
/// mutation (unlink + ancestor recompute) happens under a single write lock.
/// Filesystem calls run without holding any lock.
///
/// The client's `remove` is taken as atomic: a directory that was only
/// partly removed by the store is reported as a failure and left in the tree
/// as it was; no recovery is attempted.
use crate::fs::{EntryKind, FilesystemClient};
use crate::model::size::format_size;
use crate::model::{NodeIndex, RemotePath, SharedTree};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

/// What the operator is asked when the trash is not available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPrompt {
    pub path: RemotePath,
    pub kind: EntryKind,
    /// Aggregate size of the entry.
    pub size: u64,
    /// Why the trash could not be used.
    pub reason: String,
}

impl DeletionPrompt {
    pub fn message(&self) -> String {
        format!(
            "{}. Delete this {} ({}) permanently?",
            self.reason,
            self.kind.noun(),
            format_size(self.size)
        )
    }
}

/// Yes/no decision point for permanent deletion, owned by the caller.
///
/// May block (e.g. waiting on a human); the coordinator holds no lock
/// while it runs.
pub trait ConfirmPermanent {
    fn confirm_permanent(&self, prompt: &DeletionPrompt) -> bool;
}

impl<F> ConfirmPermanent for F
where
    F: Fn(&DeletionPrompt) -> bool,
{
    fn confirm_permanent(&self, prompt: &DeletionPrompt) -> bool {
        self(prompt)
    }
}

/// Result of a deletion attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Moved to the trash; removed from the tree.
    Trashed {
        parent: NodeIndex,
        path: RemotePath,
        freed: u64,
    },
    /// Permanently removed after confirmation; removed from the tree.
    Deleted {
        parent: NodeIndex,
        path: RemotePath,
        freed: u64,
    },
    /// Declined or cancelled before any removal; tree unchanged.
    Aborted,
}

impl DeleteOutcome {
    /// Directory the presentation layer should show next.
    pub fn parent(&self) -> Option<NodeIndex> {
        match self {
            DeleteOutcome::Trashed { parent, .. } | DeleteOutcome::Deleted { parent, .. } => {
                Some(*parent)
            }
            DeleteOutcome::Aborted => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    /// The search root cannot be deleted.
    #[error("the search root cannot be deleted")]
    Protected,

    /// The target is not (or no longer) part of the tree.
    #[error("entry is no longer part of the scanned tree")]
    StaleEntry,

    /// Trash is unsupported or failed. Recovered by the coordinator through
    /// the confirmation fallback and shown as the prompt's reason; never
    /// returned by [`delete_entry`].
    #[error("trash not available for {path}: {reason}")]
    TrashUnavailable { path: RemotePath, reason: String },

    /// Permanent removal failed; the tree is unchanged.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: RemotePath, message: String },

    /// A name on the way to the target is not a single path segment, so the
    /// entry has no address in the store. Rejected before any client call.
    #[error("entry {name:?} cannot be addressed in the store")]
    InvalidName { name: String },

    /// The background worker ended without reporting; whether the store
    /// changed is unknown.
    #[error("deletion worker exited without reporting a result")]
    WorkerLost,
}

/// Delete `target` from the store and, on success, from `tree`.
pub fn delete_entry(
    client: &dyn FilesystemClient,
    tree: &SharedTree,
    target: NodeIndex,
    confirm: &dyn ConfirmPermanent,
    cancel_flag: &AtomicBool,
) -> Result<DeleteOutcome, DeleteError> {
    // Guard.
    let (path, kind, size) = {
        let tree = tree.read();
        if tree.is_root(target) {
            return Err(DeleteError::Protected);
        }
        if !tree.is_attached(target) {
            return Err(DeleteError::StaleEntry);
        }
        let node = tree.node(target);
        let kind = if node.is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let Some(path) = tree.full_path(target) else {
            return Err(DeleteError::InvalidName {
                name: node.name.to_string(),
            });
        };
        (path, kind, node.size)
    };

    if cancel_flag.load(Ordering::Relaxed) {
        return Ok(DeleteOutcome::Aborted);
    }

    let permanent = match try_trash(client, &path, kind) {
        Ok(()) => false,
        Err(unavailable) => {
            warn!("{unavailable}");
            let prompt = DeletionPrompt {
                path: path.clone(),
                kind,
                size,
                reason: unavailable.to_string(),
            };
            if !confirm.confirm_permanent(&prompt) {
                info!("Permanent deletion of {path} declined");
                return Ok(DeleteOutcome::Aborted);
            }
            if cancel_flag.load(Ordering::Relaxed) {
                return Ok(DeleteOutcome::Aborted);
            }
            match client.remove(&path, kind) {
                Ok(true) => true,
                Ok(false) => {
                    return Err(DeleteError::PermanentDeleteFailed {
                        path,
                        message: "the store reported the entry was not removed".to_string(),
                    })
                }
                Err(err) => {
                    return Err(DeleteError::PermanentDeleteFailed {
                        path,
                        message: err.to_string(),
                    })
                }
            }
        }
    };

    // The store confirmed; apply the mutation as one step.
    let mut tree = tree.write();
    let Some(parent) = tree.node(target).parent else {
        return Err(DeleteError::Protected);
    };
    let Some(freed) = tree.remove_subtree(target) else {
        warn!("{path} was removed from the store but had already left the tree");
        return Err(DeleteError::StaleEntry);
    };
    tree.recompute_ancestors(parent);

    if permanent {
        info!("Deleted {} {path} ({freed} bytes)", kind.noun());
        Ok(DeleteOutcome::Deleted {
            parent,
            path,
            freed,
        })
    } else {
        info!("Moved {} {path} to trash ({freed} bytes)", kind.noun());
        Ok(DeleteOutcome::Trashed {
            parent,
            path,
            freed,
        })
    }
}

/// Any failure is reported as [`DeleteError::TrashUnavailable`].
fn try_trash(
    client: &dyn FilesystemClient,
    path: &RemotePath,
    kind: EntryKind,
) -> Result<(), DeleteError> {
    let reason = match client.move_to_trash(path, kind) {
        Ok(true) => return Ok(()),
        Ok(false) => "trash not supported".to_string(),
        Err(err) => err.to_string(),
    };
    Err(DeleteError::TrashUnavailable {
        path: path.clone(),
        reason,
    })
}

/// Handle to a deletion running on a background thread.
pub struct DeleteHandle {
    /// Receives exactly one result.
    pub result_rx: Receiver<Result<DeleteOutcome, DeleteError>>,
    /// Node being deleted.
    pub target: NodeIndex,
    cancel_flag: Arc<AtomicBool>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl DeleteHandle {
    /// Abort if no removal call has been issued yet. A call already in
    /// flight runs to completion.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }
}

/// Run [`delete_entry`] on a background thread.
pub fn start_delete(
    client: Arc<dyn FilesystemClient>,
    tree: SharedTree,
    target: NodeIndex,
    confirm: Box<dyn ConfirmPermanent + Send>,
) -> std::io::Result<DeleteHandle> {
    let (result_tx, result_rx) = crossbeam_channel::bounded(1);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();

    let thread = thread::Builder::new()
        .name("duscope-delete".into())
        .spawn(move || {
            let result = delete_entry(
                client.as_ref(),
                &tree,
                target,
                confirm.as_ref(),
                &cancel_clone,
            );
            let _ = result_tx.send(result);
        })?;

    Ok(DeleteHandle {
        result_rx,
        target,
        cancel_flag,
        _thread: Some(thread),
    })
}
