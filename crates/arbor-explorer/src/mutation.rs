use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_vfs::{FileSystem, FsEntry};

use crate::error::{DeleteReport, MutationError};
use crate::tree::FileTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Move,
    Copy,
}

/// A move or copy that hit an existing entry at the destination and is
/// waiting for an explicit overwrite confirmation. No filesystem call has
/// been made yet; dropping this value aborts with no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub kind: TransferKind,
    pub source: PathBuf,
    pub dest_dir: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed(PathBuf),
    /// Destination name already taken; resume via
    /// [`MutationCoordinator::complete_transfer`].
    Conflict(PendingTransfer),
}

/// Executes create/rename/delete/move/copy against the filesystem and
/// applies the matching optimistic tree edit.
///
/// Every operation follows the same sequence: validate locally, call the
/// filesystem, then patch the tree on success. The caller schedules the
/// deferred reconcile that makes the optimistic edit authoritative.
pub struct MutationCoordinator {
    fs: Arc<dyn FileSystem>,
}

impl MutationCoordinator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Creates an empty file or directory under `parent` and inserts it into
    /// the tree, auto-expanding the parent.
    pub fn create(
        &self,
        tree: &mut FileTree,
        parent: &Path,
        name: &str,
        kind: EntryKind,
    ) -> Result<PathBuf, MutationError> {
        validate_name(name)?;
        let path = parent.join(name);
        match kind {
            EntryKind::File => {
                self.fs
                    .create_file(&path, b"")
                    .map_err(|source| MutationError::Fs {
                        op: "create file",
                        path: path.clone(),
                        source,
                    })?;
                tree.insert_node(parent, FsEntry::file(&path));
            }
            EntryKind::Directory => {
                self.fs
                    .create_dir(&path)
                    .map_err(|source| MutationError::Fs {
                        op: "create directory",
                        path: path.clone(),
                        source,
                    })?;
                tree.insert_node(parent, FsEntry::directory(&path));
            }
        }
        tracing::debug!(path = %path.display(), "created entry");
        Ok(path)
    }

    /// Renames an entry in place. Renaming to the current name is a no-op
    /// that touches neither disk nor tree.
    pub fn rename(
        &self,
        tree: &mut FileTree,
        path: &Path,
        new_name: &str,
    ) -> Result<PathBuf, MutationError> {
        validate_name(new_name)?;
        if !tree.contains(path) {
            return Err(MutationError::UnknownPath {
                path: path.to_path_buf(),
            });
        }
        let parent = path.parent().ok_or_else(|| MutationError::UnknownPath {
            path: path.to_path_buf(),
        })?;
        let new_path = parent.join(new_name);
        if new_path == path {
            return Ok(new_path);
        }

        self.fs
            .rename(path, &new_path)
            .map_err(|source| MutationError::Fs {
                op: "rename",
                path: path.to_path_buf(),
                source,
            })?;
        tree.rename_node(path, new_name);
        tracing::debug!(from = %path.display(), to = %new_path.display(), "renamed entry");
        Ok(new_path)
    }

    /// Deletes each path independently; directories are removed recursively.
    /// Failures do not abort the batch.
    pub fn delete(&self, tree: &mut FileTree, paths: &[PathBuf]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for path in paths {
            match self.fs.remove(path) {
                Ok(()) => {
                    tree.remove_node(path);
                    report.removed.push(path.clone());
                }
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "delete failed");
                    report.failed.push((
                        path.clone(),
                        MutationError::Fs {
                            op: "delete",
                            path: path.clone(),
                            source,
                        },
                    ));
                }
            }
        }
        report
    }

    /// Validates and, absent a name collision, performs a move or copy of
    /// `source` into `dest_dir`.
    ///
    /// Rejected before any filesystem call when the destination is the
    /// source itself or one of its descendants (component-boundary prefix
    /// test, so `/ws/bar` does not contain `/ws/barracks`), or when the move
    /// would land on the source's current location. An existing entry at the
    /// destination suspends the operation as [`TransferOutcome::Conflict`].
    pub fn transfer(
        &self,
        tree: &mut FileTree,
        kind: TransferKind,
        source: &Path,
        dest_dir: &Path,
    ) -> Result<TransferOutcome, MutationError> {
        let Some(node) = tree.node(source) else {
            return Err(MutationError::UnknownPath {
                path: source.to_path_buf(),
            });
        };
        let is_directory = node.is_directory();
        if dest_dir.starts_with(source) {
            return Err(MutationError::DestinationInsideSource {
                source_path: source.to_path_buf(),
                dest: dest_dir.to_path_buf(),
            });
        }
        let name = source
            .file_name()
            .ok_or_else(|| MutationError::InvalidName {
                name: source.display().to_string(),
            })?;
        let dest = dest_dir.join(name);
        if dest == source {
            return Err(MutationError::SameLocation {
                path: source.to_path_buf(),
            });
        }

        let pending = PendingTransfer {
            kind,
            source: source.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
            dest,
        };
        if self.fs.exists(&pending.dest) {
            return Ok(TransferOutcome::Conflict(pending));
        }
        self.perform(tree, &pending, is_directory)?;
        Ok(TransferOutcome::Completed(pending.dest))
    }

    /// Resumes a conflicting transfer after the caller confirmed the
    /// overwrite.
    pub fn complete_transfer(
        &self,
        tree: &mut FileTree,
        pending: &PendingTransfer,
    ) -> Result<PathBuf, MutationError> {
        let is_directory = tree
            .node(&pending.source)
            .map(|n| n.is_directory())
            .unwrap_or(false);
        self.perform(tree, pending, is_directory)?;
        Ok(pending.dest.clone())
    }

    fn perform(
        &self,
        tree: &mut FileTree,
        pending: &PendingTransfer,
        is_directory: bool,
    ) -> Result<(), MutationError> {
        match pending.kind {
            TransferKind::Move => {
                self.fs
                    .rename(&pending.source, &pending.dest)
                    .map_err(|source| MutationError::Fs {
                        op: "move",
                        path: pending.source.clone(),
                        source,
                    })?;
                tree.remove_node(&pending.dest);
                tree.move_node(&pending.source, &pending.dest_dir);
            }
            TransferKind::Copy => {
                self.fs
                    .copy(&pending.source, &pending.dest)
                    .map_err(|source| MutationError::Fs {
                        op: "copy",
                        path: pending.source.clone(),
                        source,
                    })?;
                tree.remove_node(&pending.dest);
                let entry = if is_directory {
                    FsEntry::directory(&pending.dest)
                } else {
                    FsEntry::file(&pending.dest)
                };
                tree.insert_node(&pending.dest_dir, entry);
            }
        }
        tracing::debug!(
            from = %pending.source.display(),
            to = %pending.dest.display(),
            "transfer applied"
        );
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), MutationError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(MutationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
