use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use arbor_vfs::FsEntry;

use crate::error::FetchError;
use crate::loader::DirectoryLoader;

/// One in-memory mirror of a filesystem entry.
///
/// Directory lifecycle: unloaded -> loaded(collapsed) <-> loaded(expanded).
/// Invariants:
/// - `is_expanded` implies `is_loaded`.
/// - `is_loaded` implies `children` holds the sorted listing (directories
///   first, then case-insensitive by name).
/// - File nodes are never loaded or expanded and never own children.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    path: PathBuf,
    is_directory: bool,
    is_expanded: bool,
    is_loaded: bool,
    children: Vec<PathBuf>,
}

impl Node {
    fn from_entry(entry: &FsEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.clone(),
            is_directory: entry.is_directory,
            is_expanded: false,
            is_loaded: false,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// Ordered child paths. Meaningful only when `is_loaded`.
    pub fn children(&self) -> &[PathBuf] {
        &self.children
    }
}

/// The lazily-loaded workspace tree.
///
/// Nodes live in a path-keyed lookup table with explicit ordered child lists
/// per directory; there are no parent back-pointers, parents are computed
/// from the path. The tree is an advisory cache: disk is the source of truth
/// and [`FileTree::reconcile_deep`] restores consistency with it.
#[derive(Debug)]
pub struct FileTree {
    root: PathBuf,
    /// Ordered listing of the workspace root.
    roots: Vec<PathBuf>,
    nodes: HashMap<PathBuf, Node>,
}

impl FileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            roots: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ordered paths of the workspace root's entries.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// Expands a directory.
    ///
    /// An unloaded directory is fetched exactly once; an already-loaded one
    /// re-expands from cached children with zero fetches. A fetch failure
    /// leaves the node unloaded and collapsed.
    pub fn expand(&mut self, path: &Path, loader: &DirectoryLoader) -> Result<(), FetchError> {
        let Some(node) = self.nodes.get(path) else {
            return Ok(());
        };
        if !node.is_directory {
            return Ok(());
        }
        if node.is_loaded {
            self.nodes
                .get_mut(path)
                .expect("node checked above")
                .is_expanded = true;
            return Ok(());
        }

        let entries = loader.list(path)?;
        let child_paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
        for entry in &entries {
            self.nodes
                .insert(entry.path.clone(), Node::from_entry(entry));
        }
        let node = self.nodes.get_mut(path).expect("node checked above");
        node.children = child_paths;
        node.is_loaded = true;
        node.is_expanded = true;
        Ok(())
    }

    /// Collapses a directory; cached children are retained for instant
    /// re-expansion.
    pub fn collapse(&mut self, path: &Path) {
        if let Some(node) = self.nodes.get_mut(path) {
            if node.is_directory {
                node.is_expanded = false;
            }
        }
    }

    pub fn toggle(&mut self, path: &Path, loader: &DirectoryLoader) -> Result<(), FetchError> {
        match self.nodes.get(path) {
            Some(node) if node.is_directory && node.is_expanded => {
                self.collapse(path);
                Ok(())
            }
            _ => self.expand(path, loader),
        }
    }

    /// Resets a subtree to unloaded, discarding cached children, and
    /// re-expands it with a fresh fetch. Refreshing the workspace root
    /// reloads the shallow root listing.
    pub fn force_refresh(
        &mut self,
        path: &Path,
        loader: &DirectoryLoader,
    ) -> Result<(), FetchError> {
        if path == self.root {
            let entries = loader.list(&self.root)?;
            self.nodes.clear();
            self.roots = entries.iter().map(|e| e.path.clone()).collect();
            for entry in &entries {
                self.nodes
                    .insert(entry.path.clone(), Node::from_entry(entry));
            }
            return Ok(());
        }

        let Some(node) = self.nodes.get(path) else {
            return Ok(());
        };
        if !node.is_directory {
            return Ok(());
        }
        self.drop_descendants(path);
        let node = self.nodes.get_mut(path).expect("node checked above");
        node.children.clear();
        node.is_loaded = false;
        node.is_expanded = false;
        self.expand(path, loader)
    }

    /// Rebuilds the whole tree from the root, re-fetching exactly the
    /// directories that are currently expanded.
    ///
    /// Expanded directories that survived on disk stay expanded; vanished
    /// ones are silently pruned. Directories that fail to list are left
    /// unloaded. Idempotent, and the sole mechanism for catching up with
    /// concurrent external changes.
    pub fn reconcile_deep(&mut self, loader: &DirectoryLoader) {
        let expanded: HashSet<PathBuf> = self.expanded_dirs().into_iter().collect();
        let entries = match loader.list(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(error = %err, "workspace root unreadable; keeping current tree");
                return;
            }
        };

        let mut nodes = HashMap::new();
        let roots = build_level(loader, &expanded, &mut nodes, entries);
        self.nodes = nodes;
        self.roots = roots;
    }

    /// Currently-expanded directory paths in depth-first pre-order.
    ///
    /// Only recurses into expanded directories, so expansion state cached
    /// beneath a collapsed ancestor is not reported (and not preserved
    /// across a reconcile).
    pub fn expanded_dirs(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack: Vec<&PathBuf> = self.roots.iter().rev().collect();
        while let Some(path) = stack.pop() {
            if let Some(node) = self.nodes.get(path) {
                if node.is_directory && node.is_expanded {
                    out.push(path.clone());
                    stack.extend(node.children.iter().rev());
                }
            }
        }
        out
    }

    /// Applies a single optimistic insert under `parent`, keeping the
    /// sibling list sorted.
    ///
    /// A parent that is not yet loaded is materialized as loaded and
    /// expanded with just the new node, so a freshly created descendant is
    /// immediately visible; a loaded parent is auto-expanded.
    pub fn insert_node(&mut self, parent: &Path, entry: FsEntry) {
        if self.nodes.contains_key(&entry.path) {
            return;
        }

        if parent == self.root {
            self.nodes
                .insert(entry.path.clone(), Node::from_entry(&entry));
            self.roots.push(entry.path.clone());
            self.sort_root_list();
            return;
        }

        let Some(parent_node) = self.nodes.get(parent) else {
            // Parent not materialized at all (ancestor never expanded); the
            // deferred reconcile picks the entry up.
            return;
        };
        if !parent_node.is_directory {
            return;
        }

        self.nodes
            .insert(entry.path.clone(), Node::from_entry(&entry));
        let parent_node = self.nodes.get_mut(parent).expect("parent checked above");
        if parent_node.is_loaded {
            parent_node.children.push(entry.path.clone());
            parent_node.is_expanded = true;
            self.sort_children(parent);
        } else {
            parent_node.children = vec![entry.path.clone()];
            parent_node.is_loaded = true;
            parent_node.is_expanded = true;
        }
    }

    /// Applies a single optimistic removal: detaches the node from its
    /// sibling list and drops its whole subtree from the lookup table.
    pub fn remove_node(&mut self, path: &Path) -> bool {
        if !self.nodes.contains_key(path) {
            return false;
        }
        if let Some(parent) = path.parent() {
            if parent == self.root {
                self.roots.retain(|p| p != path);
            } else if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|p| p != path);
            }
        }
        self.nodes.retain(|p, _| !p.starts_with(path));
        true
    }

    /// Rewrites a node's path and name in place after a rename, re-keying
    /// every loaded descendant to the new prefix and re-sorting the sibling
    /// list. Returns the new path.
    pub fn rename_node(&mut self, old: &Path, new_name: &str) -> Option<PathBuf> {
        if !self.nodes.contains_key(old) {
            return None;
        }
        let parent = old.parent()?.to_path_buf();
        let new_path = parent.join(new_name);

        let affected: Vec<PathBuf> = self
            .nodes
            .keys()
            .filter(|p| p.starts_with(old))
            .cloned()
            .collect();
        for path in affected {
            let mut node = self.nodes.remove(&path).expect("key came from the map");
            let target = rebase(&path, old, &new_path);
            node.path = target.clone();
            if path == old {
                node.name = new_name.to_string();
            }
            node.children = node
                .children
                .iter()
                .map(|child| rebase(child, old, &new_path))
                .collect();
            self.nodes.insert(target, node);
        }

        if parent == self.root {
            for slot in &mut self.roots {
                if slot.as_path() == old {
                    *slot = new_path.clone();
                }
            }
            self.sort_root_list();
        } else if let Some(parent_node) = self.nodes.get_mut(&parent) {
            for slot in &mut parent_node.children {
                if slot.as_path() == old {
                    *slot = new_path.clone();
                }
            }
            self.sort_children(&parent);
        }
        Some(new_path)
    }

    /// Detaches a node from its parent and re-attaches it (with its loaded
    /// subtree, re-keyed) under `dest_dir`. Returns the new path.
    ///
    /// A destination that is not materialized in the tree swallows the node;
    /// the deferred reconcile brings it back into view.
    pub fn move_node(&mut self, source: &Path, dest_dir: &Path) -> Option<PathBuf> {
        let node = self.nodes.get(source)?;
        let new_path = dest_dir.join(&node.name);

        if let Some(parent) = source.parent() {
            if parent == self.root {
                self.roots.retain(|p| p != source);
            } else if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|p| p != source);
            }
        }

        if dest_dir != self.root && !self.nodes.contains_key(dest_dir) {
            self.nodes.retain(|p, _| !p.starts_with(source));
            return Some(new_path);
        }

        let affected: Vec<PathBuf> = self
            .nodes
            .keys()
            .filter(|p| p.starts_with(source))
            .cloned()
            .collect();
        for path in affected {
            let mut node = self.nodes.remove(&path).expect("key came from the map");
            let target = rebase(&path, source, &new_path);
            node.path = target.clone();
            node.children = node
                .children
                .iter()
                .map(|child| rebase(child, source, &new_path))
                .collect();
            self.nodes.insert(target, node);
        }

        if dest_dir == self.root {
            self.roots.push(new_path.clone());
            self.sort_root_list();
        } else {
            let dest_node = self.nodes.get_mut(dest_dir).expect("checked above");
            if dest_node.is_loaded {
                dest_node.children.push(new_path.clone());
                dest_node.is_expanded = true;
                self.sort_children(dest_dir);
            } else {
                dest_node.children = vec![new_path.clone()];
                dest_node.is_loaded = true;
                dest_node.is_expanded = true;
            }
        }
        Some(new_path)
    }

    fn drop_descendants(&mut self, path: &Path) {
        self.nodes.retain(|p, _| p == path || !p.starts_with(path));
    }

    fn sort_root_list(&mut self) {
        let mut list = std::mem::take(&mut self.roots);
        list.sort_by(|a, b| self.compare_sibling_paths(a, b));
        self.roots = list;
    }

    fn sort_children(&mut self, parent: &Path) {
        let Some(node) = self.nodes.get(parent) else {
            return;
        };
        let mut list = node.children.clone();
        list.sort_by(|a, b| self.compare_sibling_paths(a, b));
        self.nodes
            .get_mut(parent)
            .expect("parent checked above")
            .children = list;
    }

    fn compare_sibling_paths(&self, a: &Path, b: &Path) -> Ordering {
        let key = |path: &Path| {
            self.nodes
                .get(path)
                .map(|n| (!n.is_directory, n.name.to_lowercase()))
        };
        match (key(a), key(b)) {
            (Some(ka), Some(kb)) => ka.cmp(&kb),
            _ => a.cmp(b),
        }
    }
}

fn rebase(path: &Path, old: &Path, new: &Path) -> PathBuf {
    match path.strip_prefix(old) {
        Ok(suffix) if suffix.as_os_str().is_empty() => new.to_path_buf(),
        Ok(suffix) => new.join(suffix),
        Err(_) => path.to_path_buf(),
    }
}

fn build_level(
    loader: &DirectoryLoader,
    expanded: &HashSet<PathBuf>,
    nodes: &mut HashMap<PathBuf, Node>,
    entries: Vec<FsEntry>,
) -> Vec<PathBuf> {
    let mut level = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut node = Node::from_entry(&entry);
        if node.is_directory && expanded.contains(&node.path) {
            match loader.list(&node.path) {
                Ok(children) => {
                    node.children = build_level(loader, expanded, nodes, children);
                    node.is_loaded = true;
                    node.is_expanded = true;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "directory unreadable during reconcile; left unloaded");
                }
            }
        }
        level.push(node.path.clone());
        nodes.insert(node.path.clone(), node);
    }
    level
}
