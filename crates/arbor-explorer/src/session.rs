use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_vfs::{FileSystem, FileWatcher};

use crate::clipboard::Clipboard;
use crate::config::ExplorerConfig;
use crate::error::{DeleteReport, FetchError, MutationError, RevealError};
use crate::loader::DirectoryLoader;
use crate::mutation::{
    EntryKind, MutationCoordinator, PendingTransfer, TransferKind, TransferOutcome,
};
use crate::selection::{flatten, Activation, Selection};
use crate::tree::FileTree;
use crate::watch::WatchBridge;

/// Callbacks the engine raises toward its host.
///
/// Both are one-way and idempotent; a host that does not care simply keeps
/// the default no-ops.
pub trait ExplorerHost {
    /// Request that `path` be opened for editing.
    fn open_file(&self, _path: &Path) {}

    /// Notification that `path` no longer exists, so open views of it can be
    /// closed.
    fn file_deleted(&self, _path: &Path) {}
}

/// Host that ignores every callback.
#[derive(Debug, Default)]
pub struct NullHost;

impl ExplorerHost for NullHost {}

/// Result of pasting the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    Completed(PathBuf),
    /// Destination name taken; resolve with [`WorkspaceSession::confirm_paste`]
    /// or [`WorkspaceSession::decline_paste`].
    NeedsConfirmation { source: PathBuf, dest: PathBuf },
    EmptyClipboard,
}

/// One open workspace: the tree, selection, clipboard, and watch
/// subscription for a single root directory.
///
/// All state lives on the caller's thread; the only background activity is
/// the watch bridge's debounce thread, which communicates exclusively
/// through the request channel drained by [`WorkspaceSession::poll_reconcile`].
pub struct WorkspaceSession {
    fs: Arc<dyn FileSystem>,
    config: ExplorerConfig,
    loader: DirectoryLoader,
    mutations: MutationCoordinator,
    tree: FileTree,
    selection: Selection,
    clipboard: Clipboard,
    host: Box<dyn ExplorerHost>,
    bridge: Option<WatchBridge>,
    pending_paste: Option<PendingTransfer>,
    applied_generation: u64,
}

impl WorkspaceSession {
    /// Opens a workspace: loads the shallow root listing and prepares the
    /// session. Watching starts separately via [`WorkspaceSession::watch`].
    pub fn open(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        config: ExplorerConfig,
        host: Box<dyn ExplorerHost>,
    ) -> Result<Self, FetchError> {
        let root = root.into();
        let loader = DirectoryLoader::new(fs.clone(), config.hidden_names.clone());
        let mut tree = FileTree::new(root.clone());
        tree.force_refresh(&root, &loader)?;
        Ok(Self {
            mutations: MutationCoordinator::new(fs.clone()),
            fs,
            config,
            loader,
            tree,
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            host,
            bridge: None,
            pending_paste: None,
            applied_generation: 0,
        })
    }

    /// Subscribes `watcher` to the workspace root. A previous subscription
    /// is released first.
    pub fn watch<W>(&mut self, watcher: W) -> io::Result<()>
    where
        W: FileWatcher + 'static,
    {
        self.bridge = None;
        let root = self.tree.root().to_path_buf();
        let bridge = WatchBridge::subscribe(watcher, &root, self.config.debounce())?;
        self.bridge = Some(bridge);
        // Generations are per bridge; a high-water mark left over from a
        // previous subscription would make the new bridge's requests look
        // stale.
        self.applied_generation = 0;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_cut(&self, path: &Path) -> bool {
        self.clipboard.is_cut(path)
    }

    /// Depth-first visible order, as a renderer would paint it.
    pub fn visible(&self) -> Vec<PathBuf> {
        flatten(&self.tree)
    }

    // --- tree navigation ---------------------------------------------------

    pub fn expand(&mut self, path: &Path) -> Result<(), FetchError> {
        self.tree.expand(path, &self.loader)
    }

    pub fn collapse(&mut self, path: &Path) {
        self.tree.collapse(path);
    }

    pub fn toggle(&mut self, path: &Path) -> Result<(), FetchError> {
        self.tree.toggle(path, &self.loader)
    }

    /// Explicit user-triggered refresh of one directory (or the root).
    pub fn force_refresh(&mut self, path: &Path) -> Result<(), FetchError> {
        let result = self.tree.force_refresh(path, &self.loader);
        self.selection.retain_existing(&self.tree);
        result
    }

    // --- selection ----------------------------------------------------------

    /// Plain click: selection becomes the clicked path; a directory
    /// additionally toggles its expansion, a file is opened via the host.
    pub fn click(&mut self, path: &Path) -> Result<(), FetchError> {
        self.selection.select(path);
        match self.tree.node(path).map(|n| n.is_directory()) {
            Some(true) => self.tree.toggle(path, &self.loader)?,
            Some(false) => self.host.open_file(path),
            None => {}
        }
        Ok(())
    }

    /// Modifier click: membership toggle, never expansion.
    pub fn modifier_click(&mut self, path: &Path) {
        self.selection.toggle(path);
    }

    /// Shift click: adds to the selection and moves the anchor.
    pub fn shift_click(&mut self, path: &Path) {
        self.selection.extend(path);
    }

    pub fn focus_next(&mut self) {
        self.selection.focus_next(&self.tree);
    }

    pub fn focus_previous(&mut self) {
        self.selection.focus_previous(&self.tree);
    }

    /// Enter on the anchor: opens a file via the host, toggles a directory.
    pub fn activate(&mut self) -> Result<(), FetchError> {
        match self.selection.activate(&self.tree) {
            Some(Activation::OpenFile(path)) => {
                self.host.open_file(&path);
                Ok(())
            }
            Some(Activation::ToggleDirectory(path)) => self.tree.toggle(&path, &self.loader),
            None => Ok(()),
        }
    }

    // --- mutations ----------------------------------------------------------

    /// Creates an empty file, selects it, and asks the host to open it.
    pub fn create_file(&mut self, parent: &Path, name: &str) -> Result<PathBuf, MutationError> {
        let path = self
            .mutations
            .create(&mut self.tree, parent, name, EntryKind::File)?;
        self.selection.select(path.clone());
        self.host.open_file(&path);
        self.schedule_deferred_reconcile();
        Ok(path)
    }

    pub fn create_dir(&mut self, parent: &Path, name: &str) -> Result<PathBuf, MutationError> {
        let path = self
            .mutations
            .create(&mut self.tree, parent, name, EntryKind::Directory)?;
        self.selection.select(path.clone());
        self.schedule_deferred_reconcile();
        Ok(path)
    }

    /// Renames an entry; the selection follows the new path.
    pub fn rename(&mut self, path: &Path, new_name: &str) -> Result<PathBuf, MutationError> {
        let new_path = self.mutations.rename(&mut self.tree, path, new_name)?;
        self.selection.follow_rename(path, &new_path);
        self.schedule_deferred_reconcile();
        Ok(new_path)
    }

    /// Deletes each path independently. Succeeded paths leave the tree and
    /// selection and are reported to the host; failures are returned
    /// alongside.
    pub fn delete(&mut self, paths: &[PathBuf]) -> DeleteReport {
        let report = self.mutations.delete(&mut self.tree, paths);
        for path in &report.removed {
            self.selection.remove(path);
            self.host.file_deleted(path);
        }
        if !report.removed.is_empty() {
            self.schedule_deferred_reconcile();
        }
        report
    }

    /// Moves `source` into `dest_dir` (drag and drop). A name collision is
    /// returned as [`TransferOutcome::Conflict`]; resume it with
    /// [`WorkspaceSession::confirm_transfer`] or drop it to abort.
    pub fn move_entry(
        &mut self,
        source: &Path,
        dest_dir: &Path,
    ) -> Result<TransferOutcome, MutationError> {
        let outcome = self
            .mutations
            .transfer(&mut self.tree, TransferKind::Move, source, dest_dir)?;
        if let TransferOutcome::Completed(dest) = &outcome {
            self.selection.follow_rename(source, dest);
            self.schedule_deferred_reconcile();
        }
        Ok(outcome)
    }

    pub fn copy_entry(
        &mut self,
        source: &Path,
        dest_dir: &Path,
    ) -> Result<TransferOutcome, MutationError> {
        let outcome = self
            .mutations
            .transfer(&mut self.tree, TransferKind::Copy, source, dest_dir)?;
        if matches!(outcome, TransferOutcome::Completed(_)) {
            self.schedule_deferred_reconcile();
        }
        Ok(outcome)
    }

    /// Confirms a conflicting transfer, overwriting the destination.
    pub fn confirm_transfer(
        &mut self,
        pending: &PendingTransfer,
    ) -> Result<PathBuf, MutationError> {
        let dest = self.mutations.complete_transfer(&mut self.tree, pending)?;
        if pending.kind == TransferKind::Move {
            self.selection.follow_rename(&pending.source, &dest);
        }
        self.schedule_deferred_reconcile();
        Ok(dest)
    }

    // --- clipboard ----------------------------------------------------------

    pub fn copy_to_clipboard(&mut self, path: &Path) {
        self.clipboard.copy(path);
    }

    pub fn cut_to_clipboard(&mut self, path: &Path) {
        self.clipboard.cut(path);
    }

    /// Pastes the clipboard onto `target` (falling back to the current
    /// anchor, then the workspace root). A successful cut clears the
    /// clipboard; a copy stays armed for further pastes.
    pub fn paste(&mut self, target: Option<&Path>) -> Result<PasteOutcome, MutationError> {
        let Some(entry) = self.clipboard.entry().cloned() else {
            return Ok(PasteOutcome::EmptyClipboard);
        };
        let target = target
            .map(Path::to_path_buf)
            .or_else(|| self.selection.anchor().map(Path::to_path_buf));
        let dest_dir = Clipboard::resolve_destination(&self.tree, target.as_deref());

        let outcome =
            self.mutations
                .transfer(&mut self.tree, entry.kind, &entry.path, &dest_dir)?;
        match outcome {
            TransferOutcome::Completed(dest) => {
                self.finish_paste(&entry.path, entry.kind, &dest);
                Ok(PasteOutcome::Completed(dest))
            }
            TransferOutcome::Conflict(pending) => {
                let (source, dest) = (pending.source.clone(), pending.dest.clone());
                self.pending_paste = Some(pending);
                Ok(PasteOutcome::NeedsConfirmation { source, dest })
            }
        }
    }

    /// Confirms the suspended paste, overwriting the destination. Returns
    /// `None` when no paste is pending.
    pub fn confirm_paste(&mut self) -> Result<Option<PathBuf>, MutationError> {
        let Some(pending) = self.pending_paste.take() else {
            return Ok(None);
        };
        let dest = self.mutations.complete_transfer(&mut self.tree, &pending)?;
        self.finish_paste(&pending.source, pending.kind, &dest);
        Ok(Some(dest))
    }

    /// Aborts the suspended paste: no filesystem call, no tree change, and
    /// the clipboard entry stays armed.
    pub fn decline_paste(&mut self) {
        self.pending_paste = None;
    }

    fn finish_paste(&mut self, source: &Path, kind: TransferKind, dest: &Path) {
        if kind == TransferKind::Move {
            self.clipboard.clear();
            self.selection.follow_rename(source, dest);
        }
        self.schedule_deferred_reconcile();
    }

    // --- reveal -------------------------------------------------------------

    /// Expands every ancestor of `path` from the root down, then moves the
    /// selection to it.
    pub fn reveal(&mut self, path: &Path) -> Result<(), RevealError> {
        let relative =
            path.strip_prefix(self.tree.root())
                .map_err(|_| RevealError::OutsideWorkspace {
                    path: path.to_path_buf(),
                    root: self.tree.root().to_path_buf(),
                })?;
        if relative.as_os_str().is_empty() {
            return Err(RevealError::NotFound {
                path: path.to_path_buf(),
            });
        }

        // Each ancestor must finish loading before the next level can be
        // known to the tree.
        let mut ancestor = self.tree.root().to_path_buf();
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() {
                break;
            }
            ancestor = ancestor.join(component);
            self.tree.expand(&ancestor, &self.loader)?;
        }

        if !self.tree.contains(path) {
            return Err(RevealError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.selection.select(path);
        Ok(())
    }

    // --- reconciliation -----------------------------------------------------

    /// Drains pending watch-bridge requests and runs at most one deep
    /// reconcile for them. Returns `true` if a reconcile ran.
    ///
    /// Queued requests older than the last applied generation are stale and
    /// dropped without a second rebuild.
    pub fn poll_reconcile(&mut self) -> bool {
        let mut newest = None;
        if let Some(bridge) = &self.bridge {
            while let Ok(request) = bridge.requests().try_recv() {
                newest = Some(request.generation);
            }
        }
        match newest {
            Some(generation) if generation > self.applied_generation => {
                self.applied_generation = generation;
                self.reconcile_now();
                true
            }
            _ => false,
        }
    }

    /// Runs a deep reconcile immediately on the caller's thread.
    pub fn reconcile_now(&mut self) {
        self.tree.reconcile_deep(&self.loader);
        self.selection.retain_existing(&self.tree);
        if let Some(entry) = self.clipboard.entry() {
            // A clipboard source that vanished from disk cannot be pasted.
            if !self.fs.exists(&entry.path) {
                self.clipboard.clear();
            }
        }
    }

    fn schedule_deferred_reconcile(&self) {
        if let Some(bridge) = &self.bridge {
            bridge.schedule_reconcile(self.config.reconcile_delay());
        }
    }
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("root", &self.tree.root())
            .field("watching", &self.bridge.is_some())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}
