//! End-to-end tests for `Session`: the headless state machine frontends drive.
//!
//! Real background scan and delete threads are used; `MemoryFs` stands in for
//! the remote store where the test needs to inspect calls or inject
//! failures, `LocalFs` over a temp directory elsewhere.
use duscope_core::delete::{DeleteError, DeleteOutcome, DeletionPrompt};
use duscope_core::fs::memory::{FsCall, TrashMode};
use duscope_core::fs::{FilesystemClient, LocalFs, MemoryFs};
use duscope_core::model::RemotePath;
use duscope_core::scanner::NameFilter;
use duscope_session::state::MAX_SCAN_ERRORS;
use duscope_session::{ScanStart, Session, SessionError, SessionPhase};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// ```text
/// /data/
///   a/ x.bin (10)  y.bin (20)
///   b/ z.bin (5)
///   w.bin (1)
/// ```
fn memory_store() -> Arc<MemoryFs> {
    let fs = MemoryFs::new();
    fs.add_file("/data/a/x.bin", 10)
        .add_file("/data/a/y.bin", 20)
        .add_file("/data/b/z.bin", 5)
        .add_file("/data/w.bin", 1);
    Arc::new(fs)
}

fn session_over(fs: &Arc<MemoryFs>) -> Session {
    let client: Arc<dyn FilesystemClient> = fs.clone();
    Session::new(client)
}

/// Pump `process_scan_messages()` until the phase leaves `Scanning` or the
/// deadline expires.
fn pump_until_done(session: &mut Session) {
    let phase = session.wait_for_scan(Duration::from_secs(30));
    assert_ne!(phase, SessionPhase::Scanning, "scan did not finish within 30 seconds");
}

fn scanned(fs: &Arc<MemoryFs>) -> Session {
    let mut session = session_over(fs);
    session
        .start_scan(RemotePath::parse("/data"), NameFilter::none())
        .unwrap();
    pump_until_done(&mut session);
    assert_eq!(session.phase, SessionPhase::Results);
    session
}

fn pump_delete(session: &mut Session) -> Result<DeleteOutcome, DeleteError> {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        if let Some(result) = session.process_delete_messages() {
            return result;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "delete did not finish within 30 seconds"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn names(session: &Session) -> Vec<String> {
    session.listing().into_iter().map(|r| r.name).collect()
}

// ── Scan lifecycle ─────────────────────────────────────────────────────────────

#[test]
fn new_session_is_idle_without_tree() {
    let session = session_over(&memory_store());
    assert_eq!(session.phase, SessionPhase::Idle);
    assert!(session.tree().is_none());
    assert!(session.listing().is_empty());
    assert!(session.breadcrumb().is_none());
}

#[test]
fn completed_scan_shows_root_listing() {
    let mut session = scanned(&memory_store());

    assert_eq!(session.breadcrumb(), Some(RemotePath::parse("/data")));
    assert_eq!(names(&session), vec!["a", "b", "w.bin"]);
    assert_eq!(session.scan_total_size, 36);
    assert!(session.scan_duration.is_some());
    assert!(!session.is_busy());

    let rows = session.listing();
    let a = &rows[0];
    assert!(a.is_dir);
    assert_eq!(a.size, 30);
    assert!((a.percent_of_parent - 83.33).abs() < 0.1);

    assert!(session.enter("a"));
    assert_eq!(names(&session), vec!["y.bin", "x.bin"]);
}

#[test]
fn missing_root_is_corrected_after_acceptance() {
    let fs = memory_store();
    let mut session = session_over(&fs);

    let mut asked = None;
    let start = session
        .resolve_and_scan(&RemotePath::parse("/data/a/nope/deeper"), NameFilter::none(), |r| {
            asked = Some(r.prompt());
            true
        })
        .unwrap();

    assert_eq!(
        start,
        ScanStart::Started {
            root: RemotePath::parse("/data/a"),
            corrected: true
        }
    );
    assert!(asked.unwrap().contains("/data/a/nope/deeper"));
    pump_until_done(&mut session);
    assert_eq!(session.scan_total_size, 30);
}

#[test]
fn declined_correction_starts_nothing() {
    let fs = memory_store();
    let mut session = session_over(&fs);

    let start = session
        .resolve_and_scan(&RemotePath::parse("/data/missing"), NameFilter::none(), |_| false)
        .unwrap();

    assert_eq!(
        start,
        ScanStart::Declined {
            suggested: RemotePath::parse("/data")
        }
    );
    assert_eq!(session.phase, SessionPhase::Idle);
    assert!(!fs.calls().iter().any(|c| matches!(c, FsCall::List(_))));
}

#[test]
fn existing_root_never_asks() {
    let mut session = session_over(&memory_store());
    let start = session
        .resolve_and_scan(&RemotePath::parse("/data/b"), NameFilter::none(), |_| {
            panic!("no correction expected")
        })
        .unwrap();
    assert!(matches!(start, ScanStart::Started { corrected: false, .. }));
    pump_until_done(&mut session);
}

#[test]
fn unreachable_root_is_a_resolve_error() {
    let fs = Arc::new(MemoryFs::without_root());
    let session = session_over(&fs);
    let err = session.resolve(&RemotePath::parse("/x/y")).unwrap_err();
    assert!(matches!(err, SessionError::Resolve(_)));
}

#[test]
fn unreadable_root_fails_the_scan() {
    let fs = memory_store();
    fs.deny_listing("/data");
    let mut session = session_over(&fs);
    session
        .start_scan(RemotePath::parse("/data"), NameFilter::none())
        .unwrap();
    pump_until_done(&mut session);

    assert_eq!(session.phase, SessionPhase::Failed);
    assert!(session.scan_failure.as_deref().unwrap().contains("/data"));
    assert!(session.tree().is_none());
}

#[test]
fn cancelled_scan_leaves_no_tree() {
    let fs = MemoryFs::new().with_list_delay(Duration::from_millis(20));
    for i in 0..50 {
        fs.add_file(&format!("/slow/d{i}/f"), 1);
    }
    let fs = Arc::new(fs);
    let mut session = session_over(&fs);
    session
        .start_scan(RemotePath::parse("/slow"), NameFilter::none())
        .unwrap();
    session.cancel_scan();
    pump_until_done(&mut session);

    assert_eq!(session.phase, SessionPhase::Failed);
    assert!(session.scan_was_cancelled);
    assert!(session.tree().is_none());
}

/// A second scan supersedes the first; only the second tree is installed.
#[test]
fn restarting_scan_replaces_previous_results() {
    let fs = memory_store();
    let mut session = scanned(&fs);
    let first = session.tree().unwrap();

    session
        .start_scan(RemotePath::parse("/data/a"), NameFilter::none())
        .unwrap();
    assert!(session.tree().is_none());
    pump_until_done(&mut session);

    let second = session.tree().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.read().total_size, 30);
}

#[test]
fn filter_is_applied_to_session_scans() {
    let fs = memory_store();
    let mut session = session_over(&fs);
    session
        .start_scan(
            RemotePath::parse("/data"),
            NameFilter::excluding(["b"]).unwrap(),
        )
        .unwrap();
    pump_until_done(&mut session);
    assert_eq!(names(&session), vec!["a", "w.bin"]);
    assert_eq!(session.scan_total_size, 31);
}

#[test]
fn scan_errors_are_counted_and_capped() {
    let fs = MemoryFs::new();
    let total = MAX_SCAN_ERRORS + 25;
    for i in 0..total {
        let dir = format!("/many/d{i}");
        fs.add_dir(&dir).deny_listing(&dir);
    }
    let fs = Arc::new(fs);
    let mut session = session_over(&fs);
    session
        .start_scan(RemotePath::parse("/many"), NameFilter::none())
        .unwrap();
    pump_until_done(&mut session);

    assert_eq!(session.phase, SessionPhase::Results);
    assert_eq!(session.scan_error_count, total as u64);
    assert_eq!(session.scan_errors.len(), MAX_SCAN_ERRORS);
}

// ── Navigation ────────────────────────────────────────────────────────────────

#[test]
fn navigation_up_and_down() {
    let mut session = scanned(&memory_store());

    assert!(!session.go_up(), "root has no parent");
    assert!(session.enter("b"));
    assert_eq!(session.breadcrumb(), Some(RemotePath::parse("/data/b")));
    assert!(!session.enter("z.bin"), "files cannot be entered");
    assert!(!session.enter("nothing"));
    assert!(session.go_up());
    assert_eq!(session.breadcrumb(), Some(RemotePath::parse("/data")));
}

// ── Deletion ──────────────────────────────────────────────────────────────────

#[test]
fn delete_now_trashes_and_returns_to_parent() {
    let fs = memory_store();
    let mut session = scanned(&fs);
    assert!(session.enter("a"));
    let x = session.listing().into_iter().find(|r| r.name == "x.bin").unwrap();

    let outcome = session
        .delete_now(x.node_index, &|_: &DeletionPrompt| -> bool { panic!("trash works") })
        .unwrap();

    assert!(matches!(outcome, DeleteOutcome::Trashed { freed: 10, .. }));
    assert!(fs.is_trashed("/data/a/x.bin"));
    assert_eq!(session.breadcrumb(), Some(RemotePath::parse("/data/a")));
    assert_eq!(names(&session), vec!["y.bin"]);
    assert_eq!(session.tree().unwrap().read().total_size, 26);
}

#[test]
fn deleting_a_directory_navigates_to_its_parent() {
    let fs = memory_store();
    let mut session = scanned(&fs);
    let a = session.listing()[0].node_index;

    session
        .delete_now(a, &|_: &DeletionPrompt| true)
        .unwrap();

    assert_eq!(session.breadcrumb(), Some(RemotePath::parse("/data")));
    assert_eq!(names(&session), vec!["b", "w.bin"]);
    assert!(!session.change_folder(a), "deleted folder cannot be shown");
}

#[test]
fn background_delete_with_confirmed_fallback() {
    let fs = memory_store();
    fs.set_trash_mode(TrashMode::Unavailable);
    let mut session = scanned(&fs);
    let b = session.listing()[1].node_index;

    session
        .request_delete(b, Box::new(|p: &DeletionPrompt| p.size == 5))
        .unwrap();
    assert!(session.is_busy());
    assert!(matches!(
        session.request_delete(b, Box::new(|_: &DeletionPrompt| true)),
        Err(SessionError::Busy)
    ));

    let outcome = pump_delete(&mut session).unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted { freed: 5, .. }));
    assert!(!fs.contains("/data/b"));
    assert!(!session.is_busy());
    assert_eq!(session.tree().unwrap().read().total_size, 31);
}

#[test]
fn background_delete_declined_changes_nothing() {
    let fs = memory_store();
    fs.set_trash_mode(TrashMode::Failing);
    let mut session = scanned(&fs);
    let w = session.listing()[2].node_index;

    session
        .request_delete(w, Box::new(|_: &DeletionPrompt| false))
        .unwrap();

    assert_eq!(pump_delete(&mut session).unwrap(), DeleteOutcome::Aborted);
    assert!(fs.contains("/data/w.bin"));
    assert_eq!(names(&session), vec!["a", "b", "w.bin"]);
}

#[test]
fn failed_permanent_delete_keeps_tree() {
    let fs = memory_store();
    fs.set_trash_mode(TrashMode::Unavailable).set_remove_fails(true);
    let mut session = scanned(&fs);
    let w = session.listing()[2].node_index;

    let err = session
        .delete_now(w, &|_: &DeletionPrompt| true)
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Delete(DeleteError::PermanentDeleteFailed { .. })
    ));
    assert_eq!(session.tree().unwrap().read().total_size, 36);
}

#[test]
fn root_cannot_be_deleted_through_session() {
    let fs = memory_store();
    let mut session = scanned(&fs);
    let root = session.tree().unwrap().read().root;

    let err = session
        .delete_now(root, &|_: &DeletionPrompt| true)
        .unwrap_err();

    assert!(matches!(err, SessionError::Delete(DeleteError::Protected)));
    assert!(fs.mutating_calls().is_empty());
}

#[test]
fn delete_refused_without_results_or_during_scan() {
    let fs = MemoryFs::new().with_list_delay(Duration::from_millis(20));
    for i in 0..20 {
        fs.add_file(&format!("/slow/d{i}/f"), 1);
    }
    let fs = Arc::new(fs);
    let mut session = session_over(&fs);
    let root = duscope_core::model::NodeIndex::new(0);

    assert!(matches!(
        session.delete_now(root, &|_: &DeletionPrompt| true),
        Err(SessionError::NoTree)
    ));

    session
        .start_scan(RemotePath::parse("/slow"), NameFilter::none())
        .unwrap();
    assert!(matches!(
        session.delete_now(root, &|_: &DeletionPrompt| true),
        Err(SessionError::Busy)
    ));
    session.cancel_scan();
    pump_until_done(&mut session);
}

/// Deleting through a real local directory with a trash configured.
#[test]
fn local_trash_round_trip() {
    let tmp = TempDir::new().unwrap();
    let trash = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("proj/build")).unwrap();
    fs::write(tmp.path().join("proj/build/out.o"), vec![0u8; 400]).unwrap();
    fs::write(tmp.path().join("proj/main.rs"), vec![0u8; 100]).unwrap();

    let client: Arc<dyn FilesystemClient> =
        Arc::new(LocalFs::new(tmp.path()).with_trash(trash.path()));
    let mut session = Session::new(client);
    session
        .start_scan(RemotePath::parse("/proj"), NameFilter::none())
        .unwrap();
    pump_until_done(&mut session);
    let build = session.listing()[0].node_index;

    session
        .delete_now(build, &|_: &DeletionPrompt| false)
        .unwrap();

    assert!(trash.path().join("Current/proj/build/out.o").exists());
    assert!(!tmp.path().join("proj/build").exists());
    assert_eq!(names(&session), vec!["main.rs"]);
}

#[test]
fn cancelled_background_delete_never_removes() {
    let fs = memory_store();
    fs.set_trash_mode(TrashMode::Unavailable);
    let mut session = scanned(&fs);
    let w = session.listing()[2].node_index;

    session
        .request_delete(
            w,
            Box::new(|_: &DeletionPrompt| {
                std::thread::sleep(Duration::from_millis(100));
                true
            }),
        )
        .unwrap();
    session.cancel_delete();

    assert_eq!(pump_delete(&mut session).unwrap(), DeleteOutcome::Aborted);
    assert!(fs.contains("/data/w.bin"));
    assert!(!fs.mutating_calls().iter().any(|c| matches!(c, FsCall::Remove(_))));
    assert_eq!(session.tree().unwrap().read().total_size, 36);
}

/// A worker that dies mid-deletion is reported as lost, not as a stale entry.
#[test]
fn vanished_delete_worker_is_reported() {
    let fs = memory_store();
    fs.set_trash_mode(TrashMode::Unavailable);
    let mut session = scanned(&fs);
    let w = session.listing()[2].node_index;

    session
        .request_delete(
            w,
            Box::new(|_: &DeletionPrompt| -> bool { panic!("confirmation dialog crashed") }),
        )
        .unwrap();

    assert!(matches!(pump_delete(&mut session), Err(DeleteError::WorkerLost)));
    assert!(!session.is_busy());
    assert!(fs.contains("/data/w.bin"));
}

#[test]
fn listing_rows_carry_modification_time() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("m")).unwrap();
    fs::write(tmp.path().join("m/f.txt"), b"hello").unwrap();
    let client: Arc<dyn FilesystemClient> = Arc::new(LocalFs::new(tmp.path()));
    let mut session = Session::new(client);
    session
        .start_scan(RemotePath::parse("/m"), NameFilter::none())
        .unwrap();
    pump_until_done(&mut session);

    let rows = session.listing();
    assert_eq!(rows[0].name, "f.txt");
    assert!(rows[0].modified.is_some());
}
