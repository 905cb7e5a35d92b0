use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::tree::FileTree;

/// What pressing Enter on the anchor should do. Returned as an intent so the
/// caller applies it; selection never mutates the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    OpenFile(PathBuf),
    ToggleDirectory(PathBuf),
}

/// Depth-first pre-order flattening of the currently visible nodes. A
/// directory's children appear only while it is expanded.
pub fn flatten(tree: &FileTree) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack: Vec<&PathBuf> = tree.roots().iter().rev().collect();
    while let Some(path) = stack.pop() {
        let Some(node) = tree.node(path) else {
            continue;
        };
        out.push(path.clone());
        if node.is_expanded() {
            stack.extend(node.children().iter().rev());
        }
    }
    out
}

/// Multi-selection over tree paths plus a keyboard anchor.
///
/// Paths here are advisory: the tree may drop them at any reconcile, so the
/// session prunes the selection after every tree change.
#[derive(Debug, Default)]
pub struct Selection {
    selected: BTreeSet<PathBuf>,
    anchor: Option<PathBuf>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<&Path> {
        self.anchor.as_deref()
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.selected.contains(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.selected.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Plain click: the selection becomes exactly `{path}`.
    pub fn select(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.selected.clear();
        self.selected.insert(path.clone());
        self.anchor = Some(path);
    }

    /// Modifier click: add or remove `path`, anchor moves to it either way.
    pub fn toggle(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.selected.remove(&path) {
            self.selected.insert(path.clone());
        }
        self.anchor = Some(path);
    }

    /// Shift click: add `path` and move the anchor. Contiguous range
    /// selection is deliberately not implemented.
    pub fn extend(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.selected.insert(path.clone());
        self.anchor = Some(path);
    }

    /// Moves the anchor one step down the flattened visible order, wrapping
    /// past the end; the selection collapses to the new anchor.
    pub fn focus_next(&mut self, tree: &FileTree) {
        self.focus_step(tree, 1);
    }

    /// Moves the anchor one step up, wrapping past the start.
    pub fn focus_previous(&mut self, tree: &FileTree) {
        self.focus_step(tree, -1);
    }

    fn focus_step(&mut self, tree: &FileTree, step: isize) {
        let visible = flatten(tree);
        if visible.is_empty() {
            return;
        }
        let len = visible.len() as isize;
        let next = match self
            .anchor
            .as_ref()
            .and_then(|anchor| visible.iter().position(|p| p == anchor))
        {
            Some(index) => (index as isize + step).rem_euclid(len) as usize,
            // No visible anchor: start from the boundary the motion enters.
            None if step > 0 => 0,
            None => visible.len() - 1,
        };
        self.select(visible[next].clone());
    }

    /// Resolves the anchor into an open or toggle intent.
    pub fn activate(&self, tree: &FileTree) -> Option<Activation> {
        let anchor = self.anchor.as_ref()?;
        let node = tree.node(anchor)?;
        if node.is_directory() {
            Some(Activation::ToggleDirectory(anchor.clone()))
        } else {
            Some(Activation::OpenFile(anchor.clone()))
        }
    }

    /// Re-keys selected paths after a rename, including selected descendants
    /// of a renamed directory.
    pub fn follow_rename(&mut self, old: &Path, new: &Path) {
        let rebased: Vec<(PathBuf, PathBuf)> = self
            .selected
            .iter()
            .filter_map(|p| {
                let suffix = p.strip_prefix(old).ok()?;
                let target = if suffix.as_os_str().is_empty() {
                    new.to_path_buf()
                } else {
                    new.join(suffix)
                };
                Some((p.clone(), target))
            })
            .collect();
        for (from, to) in rebased {
            self.selected.remove(&from);
            self.selected.insert(to);
        }
        if let Some(anchor) = &self.anchor {
            if let Ok(suffix) = anchor.strip_prefix(old) {
                self.anchor = Some(if suffix.as_os_str().is_empty() {
                    new.to_path_buf()
                } else {
                    new.join(suffix)
                });
            }
        }
    }

    /// Drops `path` and any selected descendant; the anchor resets if it was
    /// inside the removed subtree.
    pub fn remove(&mut self, path: &Path) {
        self.selected.retain(|p| !p.starts_with(path));
        if self.anchor.as_ref().is_some_and(|a| a.starts_with(path)) {
            self.anchor = None;
        }
    }

    /// Prunes paths the tree no longer holds. Called after reconciles.
    pub fn retain_existing(&mut self, tree: &FileTree) {
        self.selected.retain(|p| tree.contains(p));
        if self
            .anchor
            .as_ref()
            .is_some_and(|a| !tree.contains(a))
        {
            self.anchor = None;
        }
    }
}
