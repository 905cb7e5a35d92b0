use std::path::{Path, PathBuf};

use crate::mutation::TransferKind;
use crate::tree::FileTree;

/// The single pending copy/cut source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub path: PathBuf,
    pub kind: TransferKind,
}

/// Holds at most one entry. A successful cut-paste clears it; a copy source
/// stays armed so it can be pasted again elsewhere.
#[derive(Debug, Default)]
pub struct Clipboard {
    entry: Option<ClipboardEntry>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, path: impl Into<PathBuf>) {
        self.entry = Some(ClipboardEntry {
            path: path.into(),
            kind: TransferKind::Copy,
        });
    }

    pub fn cut(&mut self, path: impl Into<PathBuf>) {
        self.entry = Some(ClipboardEntry {
            path: path.into(),
            kind: TransferKind::Move,
        });
    }

    pub fn entry(&self) -> Option<&ClipboardEntry> {
        self.entry.as_ref()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// True when `path` is armed as a cut source, so a renderer can dim it.
    pub fn is_cut(&self, path: &Path) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.kind == TransferKind::Move && e.path == path)
    }

    /// Directory a paste onto `target` lands in: a directory receives the
    /// paste itself, a file defers to its parent, no target means the
    /// workspace root.
    pub fn resolve_destination(tree: &FileTree, target: Option<&Path>) -> PathBuf {
        let Some(target) = target else {
            return tree.root().to_path_buf();
        };
        match tree.node(target) {
            Some(node) if node.is_directory() => target.to_path_buf(),
            _ => target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| tree.root().to_path_buf()),
        }
    }
}
