//! Engine smoke test against the real local filesystem.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arbor_explorer::{ExplorerConfig, NullHost, PasteOutcome, WorkspaceSession};
use arbor_vfs::LocalFs;

#[test]
fn explorer_session_on_a_real_directory() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().to_path_buf();
    fs::create_dir(root.join("src"))?;
    fs::write(root.join("src/main.rs"), "fn main() {}\n")?;
    fs::write(root.join("README.md"), "# demo\n")?;
    fs::create_dir(root.join(".git"))?;

    let mut session = WorkspaceSession::open(
        Arc::new(LocalFs::new()),
        root.clone(),
        ExplorerConfig::default(),
        Box::new(NullHost),
    )?;

    // .git is filtered; directories lead.
    assert_eq!(
        session.visible(),
        [root.join("src"), root.join("README.md")]
    );

    session.expand(&root.join("src"))?;
    assert_eq!(
        session.visible(),
        [
            root.join("src"),
            root.join("src/main.rs"),
            root.join("README.md"),
        ]
    );

    let lib = session.create_file(&root.join("src"), "lib.rs")?;
    assert!(lib.exists());

    let renamed = session.rename(&root.join("README.md"), "NOTES.md")?;
    assert!(renamed.exists());
    assert!(!root.join("README.md").exists());

    session.copy_to_clipboard(&root.join("src/main.rs"));
    let outcome = session.paste(Some(&root))?;
    assert_eq!(outcome, PasteOutcome::Completed(root.join("main.rs")));

    // External change is picked up by an explicit reconcile.
    fs::write(root.join("src/external.rs"), "")?;
    session.reconcile_now();
    assert!(session.visible().contains(&root.join("src/external.rs")));

    let report = session.delete(&[root.join("src")]);
    assert!(report.is_complete());
    assert!(!root.join("src").exists());
    assert_eq!(
        session.visible(),
        [root.join("main.rs"), renamed.clone()],
        "remaining entries re-sorted after delete"
    );

    drop(session);
    Ok(())
}

#[cfg(feature = "watch-os")]
mod watched {
    use super::*;

    use std::time::{Duration, Instant};

    use arbor_vfs::NotifyWatcher;

    /// Real OS watcher end to end. Timing-dependent by nature, so the test
    /// polls with a generous deadline instead of asserting exact latency.
    #[test]
    fn os_watcher_triggers_reconcile() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().to_path_buf();
        fs::write(root.join("seed.txt"), "")?;

        let mut session = WorkspaceSession::open(
            Arc::new(LocalFs::new()),
            root.clone(),
            ExplorerConfig {
                debounce_ms: 50,
                ..ExplorerConfig::default()
            },
            Box::new(NullHost),
        )?;
        session.watch(NotifyWatcher::new()?)?;

        fs::write(root.join("external.txt"), "")?;

        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if session.poll_reconcile()
                && session.visible().contains(&root.join("external.txt"))
            {
                break;
            }
            assert!(Instant::now() < deadline, "no reconcile within deadline");
            std::thread::sleep(Duration::from_millis(20));
        }
        Ok(())
    }
}
