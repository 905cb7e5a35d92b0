//! End-to-end engine scenarios against the in-memory filesystem.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arbor_explorer::{
    ExplorerConfig, ExplorerHost, NullHost, PasteOutcome, TransferOutcome, WorkspaceSession,
};
use arbor_vfs::{FileSystem, ManualWatcher, ManualWatcherHandle, MemoryFs};

#[derive(Default)]
struct RecordingHost {
    opened: Mutex<Vec<PathBuf>>,
    deleted: Mutex<Vec<PathBuf>>,
}

struct SharedHost(Arc<RecordingHost>);

impl ExplorerHost for SharedHost {
    fn open_file(&self, path: &Path) {
        self.0.opened.lock().unwrap().push(path.to_path_buf());
    }

    fn file_deleted(&self, path: &Path) {
        self.0.deleted.lock().unwrap().push(path.to_path_buf());
    }
}

fn workspace() -> Arc<MemoryFs> {
    let fs = Arc::new(MemoryFs::new("/ws"));
    fs.add_file("/ws/a.txt", b"alpha");
    fs.add_dir("/ws/b");
    fs.add_file("/ws/b/c.txt", b"");
    fs
}

fn open(fs: &Arc<MemoryFs>) -> WorkspaceSession {
    WorkspaceSession::open(
        fs.clone(),
        "/ws",
        ExplorerConfig::default(),
        Box::new(NullHost),
    )
    .expect("workspace root is readable")
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[test]
fn open_loads_only_the_root_listing() {
    let fs = workspace();
    let session = open(&fs);

    assert_eq!(session.visible(), paths(&["/ws/b", "/ws/a.txt"]));
    assert_eq!(fs.read_dir_calls(Path::new("/ws")), 1);
    assert_eq!(fs.read_dir_calls(Path::new("/ws/b")), 0);
}

#[test]
fn expanding_a_directory_interleaves_its_children() {
    let fs = workspace();
    let mut session = open(&fs);

    session.expand(Path::new("/ws/b")).unwrap();
    assert_eq!(
        session.visible(),
        paths(&["/ws/b", "/ws/b/c.txt", "/ws/a.txt"])
    );
    assert_eq!(fs.read_dir_calls(Path::new("/ws/b")), 1);

    session.collapse(Path::new("/ws/b"));
    session.expand(Path::new("/ws/b")).unwrap();
    assert_eq!(fs.read_dir_calls(Path::new("/ws/b")), 1);
}

#[test]
fn created_file_is_selected_and_opened() {
    let fs = workspace();
    let host = Arc::new(RecordingHost::default());
    let mut session = WorkspaceSession::open(
        fs.clone(),
        "/ws",
        ExplorerConfig::default(),
        Box::new(SharedHost(host.clone())),
    )
    .unwrap();

    let path = session.create_file(Path::new("/ws/b"), "new.txt").unwrap();
    assert_eq!(path, PathBuf::from("/ws/b/new.txt"));
    assert!(fs.exists(&path));
    assert_eq!(*host.opened.lock().unwrap(), [path.clone()]);
    assert_eq!(session.selection().anchor(), Some(path.as_path()));
    // The collapsed parent was auto-expanded to show the new entry.
    assert!(session.visible().contains(&path));
}

#[test]
fn rename_resorts_and_selection_follows() {
    let fs = workspace();
    let mut session = open(&fs);
    session.click(Path::new("/ws/a.txt")).unwrap();

    let new_path = session.rename(Path::new("/ws/a.txt"), "z.txt").unwrap();
    assert_eq!(new_path, PathBuf::from("/ws/z.txt"));
    assert_eq!(session.visible(), paths(&["/ws/b", "/ws/z.txt"]));
    assert_eq!(session.selection().anchor(), Some(Path::new("/ws/z.txt")));
    assert!(session.selection().is_selected(Path::new("/ws/z.txt")));
    assert!(fs.exists(Path::new("/ws/z.txt")));
}

#[test]
fn multi_delete_reports_failures_and_notifies_per_removed_path() {
    let fs = workspace();
    let host = Arc::new(RecordingHost::default());
    let mut session = WorkspaceSession::open(
        fs.clone(),
        "/ws",
        ExplorerConfig::default(),
        Box::new(SharedHost(host.clone())),
    )
    .unwrap();
    session.modifier_click(Path::new("/ws/a.txt"));
    session.modifier_click(Path::new("/ws/b"));

    let report = session.delete(&paths(&["/ws/a.txt", "/ws/ghost.txt", "/ws/b"]));

    assert_eq!(report.removed, paths(&["/ws/a.txt", "/ws/b"]));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, PathBuf::from("/ws/ghost.txt"));
    assert!(!report.is_complete());

    assert_eq!(
        *host.deleted.lock().unwrap(),
        paths(&["/ws/a.txt", "/ws/b"])
    );
    assert!(session.selection().is_empty());
    assert!(session.visible().is_empty());
}

#[test]
fn cut_paste_conflict_requires_confirmation() {
    let fs = workspace();
    fs.add_file("/ws/b/a.txt", b"old");
    let mut session = open(&fs);

    session.cut_to_clipboard(Path::new("/ws/a.txt"));
    assert!(session.is_cut(Path::new("/ws/a.txt")));

    let outcome = session.paste(Some(Path::new("/ws/b"))).unwrap();
    assert_eq!(
        outcome,
        PasteOutcome::NeedsConfirmation {
            source: PathBuf::from("/ws/a.txt"),
            dest: PathBuf::from("/ws/b/a.txt"),
        }
    );
    // Suspended: disk, tree, and clipboard untouched.
    assert_eq!(fs.contents(Path::new("/ws/b/a.txt")).unwrap(), b"old");
    assert!(fs.exists(Path::new("/ws/a.txt")));
    assert!(session.is_cut(Path::new("/ws/a.txt")));

    session.decline_paste();
    assert_eq!(session.confirm_paste().unwrap(), None);
    assert_eq!(fs.contents(Path::new("/ws/b/a.txt")).unwrap(), b"old");
    assert!(session.is_cut(Path::new("/ws/a.txt")));

    // Second attempt, confirmed this time.
    let outcome = session.paste(Some(Path::new("/ws/b"))).unwrap();
    assert!(matches!(outcome, PasteOutcome::NeedsConfirmation { .. }));
    let dest = session.confirm_paste().unwrap().unwrap();
    assert_eq!(dest, PathBuf::from("/ws/b/a.txt"));
    assert_eq!(fs.contents(&dest).unwrap(), b"alpha");
    assert!(!fs.exists(Path::new("/ws/a.txt")));
    assert!(!session.is_cut(Path::new("/ws/a.txt")));
}

#[test]
fn copy_source_stays_armed_for_repeated_pastes() {
    let fs = workspace();
    fs.add_dir("/ws/d");
    let mut session = open(&fs);

    session.copy_to_clipboard(Path::new("/ws/a.txt"));
    assert_eq!(
        session.paste(Some(Path::new("/ws/b"))).unwrap(),
        PasteOutcome::Completed(PathBuf::from("/ws/b/a.txt"))
    );
    assert_eq!(
        session.paste(Some(Path::new("/ws/d"))).unwrap(),
        PasteOutcome::Completed(PathBuf::from("/ws/d/a.txt"))
    );
    assert!(fs.exists(Path::new("/ws/a.txt")));
    assert_eq!(fs.contents(Path::new("/ws/b/a.txt")).unwrap(), b"alpha");
    assert_eq!(fs.contents(Path::new("/ws/d/a.txt")).unwrap(), b"alpha");
}

#[test]
fn paste_onto_a_file_lands_in_its_parent() {
    let fs = workspace();
    let mut session = open(&fs);
    session.expand(Path::new("/ws/b")).unwrap();

    session.copy_to_clipboard(Path::new("/ws/b/c.txt"));
    // Anchor on a file: destination resolves to the file's directory, which
    // already holds the source.
    session.click(Path::new("/ws/a.txt")).unwrap();
    let outcome = session.paste(None).unwrap();
    assert_eq!(outcome, PasteOutcome::Completed(PathBuf::from("/ws/c.txt")));
    assert!(fs.exists(Path::new("/ws/c.txt")));
}

#[test]
fn drag_move_conflict_resumes_via_confirm_transfer() {
    let fs = workspace();
    fs.add_file("/ws/b/a.txt", b"old");
    let mut session = open(&fs);

    let outcome = session
        .move_entry(Path::new("/ws/a.txt"), Path::new("/ws/b"))
        .unwrap();
    let TransferOutcome::Conflict(pending) = outcome else {
        panic!("expected a conflict, got {outcome:?}");
    };
    let dest = session.confirm_transfer(&pending).unwrap();
    assert_eq!(fs.contents(&dest).unwrap(), b"alpha");
    assert!(!fs.exists(Path::new("/ws/a.txt")));
}

#[test]
fn reveal_into_an_unloaded_subtree() {
    let fs = workspace();
    fs.add_file("/ws/b/deep/nest/x.txt", b"");
    let mut session = open(&fs);

    session.reveal(Path::new("/ws/b/deep/nest/x.txt")).unwrap();
    assert_eq!(
        session.visible(),
        paths(&[
            "/ws/b",
            "/ws/b/c.txt",
            "/ws/b/deep",
            "/ws/b/deep/nest",
            "/ws/b/deep/nest/x.txt",
            "/ws/a.txt",
        ])
    );
    assert_eq!(
        session.selection().anchor(),
        Some(Path::new("/ws/b/deep/nest/x.txt"))
    );
}

fn watched_session(fs: &Arc<MemoryFs>, debounce_ms: u64) -> (WorkspaceSession, ManualWatcherHandle) {
    let config = ExplorerConfig {
        debounce_ms,
        ..ExplorerConfig::default()
    };
    let mut session =
        WorkspaceSession::open(fs.clone(), "/ws", config, Box::new(NullHost)).unwrap();
    let watcher = ManualWatcher::new();
    let handle = watcher.handle();
    session.watch(watcher).unwrap();
    (session, handle)
}

#[test]
fn notification_burst_reconciles_once() {
    let fs = workspace();
    let (mut session, handle) = watched_session(&fs, 20);
    session.expand(Path::new("/ws/b")).unwrap();

    fs.add_file("/ws/b/external.txt", b"");
    for _ in 0..5 {
        handle.notify().unwrap();
    }
    std::thread::sleep(Duration::from_millis(200));

    assert!(session.poll_reconcile());
    assert!(session.visible().contains(&PathBuf::from("/ws/b/external.txt")));
    assert_eq!(fs.read_dir_calls(Path::new("/ws/b")), 2);
    assert!(!session.poll_reconcile(), "burst coalesces to one reconcile");
}

#[test]
fn plain_click_on_a_file_opens_it() {
    let fs = workspace();
    let host = Arc::new(RecordingHost::default());
    let mut session = WorkspaceSession::open(
        fs.clone(),
        "/ws",
        ExplorerConfig::default(),
        Box::new(SharedHost(host.clone())),
    )
    .unwrap();

    session.click(Path::new("/ws/a.txt")).unwrap();
    assert_eq!(*host.opened.lock().unwrap(), paths(&["/ws/a.txt"]));
    assert!(session.selection().is_selected(Path::new("/ws/a.txt")));

    // Directory clicks and modifier clicks never open.
    session.click(Path::new("/ws/b")).unwrap();
    session.modifier_click(Path::new("/ws/a.txt"));
    session.shift_click(Path::new("/ws/a.txt"));
    assert_eq!(host.opened.lock().unwrap().len(), 1);
}

#[test]
fn notifications_still_reconcile_after_a_re_watch() {
    let fs = workspace();
    let (mut session, handle) = watched_session(&fs, 10);

    // Advance the applied generation under the first watcher.
    for _ in 0..3 {
        handle.notify().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(session.poll_reconcile());
    }

    let replacement = ManualWatcher::new();
    let new_handle = replacement.handle();
    session.watch(replacement).unwrap();

    fs.add_file("/ws/late.txt", b"");
    new_handle.notify().unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert!(
        session.poll_reconcile(),
        "replacement watcher must keep delivering reconciles"
    );
    assert!(session.visible().contains(&PathBuf::from("/ws/late.txt")));
}

#[test]
fn reconcile_prunes_vanished_selection() {
    let fs = workspace();
    let (mut session, handle) = watched_session(&fs, 10);
    session.click(Path::new("/ws/a.txt")).unwrap();

    fs.remove(Path::new("/ws/a.txt")).unwrap();
    handle.notify().unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert!(session.poll_reconcile());
    assert!(session.selection().is_empty());
    assert_eq!(session.selection().anchor(), None);
    assert_eq!(session.visible(), paths(&["/ws/b"]));
}
