use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::fs::{FileSystem, FsEntry};

#[derive(Debug, Clone)]
enum MemEntry {
    File(Vec<u8>),
    Directory,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<PathBuf, MemEntry>,
    read_dir_calls: HashMap<PathBuf, usize>,
    op_counts: HashMap<&'static str, usize>,
    unreadable: HashSet<PathBuf>,
}

impl State {
    fn count(&mut self, op: &'static str) {
        *self.op_counts.entry(op).or_insert(0) += 1;
    }
}

/// Deterministic in-memory file system for tests.
///
/// Keeps every entry in a path-keyed map and never touches the OS, so engine
/// tests are free of tempdir setup and watcher timing. Directory listing
/// calls are counted per path so tests can assert fetch behavior.
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: Mutex<State>,
}

impl MemoryFs {
    /// Creates an empty file system containing just the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let fs = Self::default();
        fs.state
            .lock()
            .expect("memory fs lock")
            .entries
            .insert(root.into(), MemEntry::Directory);
        fs
    }

    /// Inserts a directory, creating missing ancestors.
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.lock().expect("memory fs lock");
        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            state
                .entries
                .entry(ancestor.to_path_buf())
                .or_insert(MemEntry::Directory);
        }
    }

    /// Inserts a file, creating missing ancestor directories.
    pub fn add_file(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dir(parent.to_path_buf());
        }
        self.state
            .lock()
            .expect("memory fs lock")
            .entries
            .insert(path, MemEntry::File(contents.to_vec()));
    }

    /// Marks a directory as unreadable; subsequent listings fail with
    /// `PermissionDenied`.
    pub fn set_unreadable(&self, path: impl Into<PathBuf>) {
        self.state
            .lock()
            .expect("memory fs lock")
            .unreadable
            .insert(path.into());
    }

    /// Number of `read_dir` calls observed for `path`.
    pub fn read_dir_calls(&self, path: &Path) -> usize {
        self.state
            .lock()
            .expect("memory fs lock")
            .read_dir_calls
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Number of calls observed for a named operation (`"exists"`,
    /// `"create_file"`, `"create_dir"`, `"rename"`, `"remove"`, `"copy"`).
    /// `read_dir` is counted per path via [`MemoryFs::read_dir_calls`].
    pub fn op_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .expect("memory fs lock")
            .op_counts
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        match self.state.lock().expect("memory fs lock").entries.get(path) {
            Some(MemEntry::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such entry: {}", path.display()),
        )
    }
}

impl FileSystem for MemoryFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut state = self.state.lock().expect("memory fs lock");
        *state
            .read_dir_calls
            .entry(path.to_path_buf())
            .or_insert(0) += 1;

        if state.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("listing denied: {}", path.display()),
            ));
        }
        match state.entries.get(path) {
            Some(MemEntry::Directory) => {}
            Some(MemEntry::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", path.display()),
                ))
            }
            None => return Err(Self::not_found(path)),
        }

        Ok(state
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, entry)| FsEntry {
                name: p
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: p.clone(),
                is_directory: matches!(entry, MemEntry::Directory),
            })
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("exists");
        state.entries.contains_key(path)
    }

    fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("create_file");
        let parent = path.parent().ok_or_else(|| Self::not_found(path))?;
        if !matches!(state.entries.get(parent), Some(MemEntry::Directory)) {
            return Err(Self::not_found(parent));
        }
        state
            .entries
            .insert(path.to_path_buf(), MemEntry::File(contents.to_vec()));
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("create_dir");
        let parent = path.parent().ok_or_else(|| Self::not_found(path))?;
        if !matches!(state.entries.get(parent), Some(MemEntry::Directory)) {
            return Err(Self::not_found(parent));
        }
        if state.entries.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("entry exists: {}", path.display()),
            ));
        }
        state.entries.insert(path.to_path_buf(), MemEntry::Directory);
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("rename");
        if !state.entries.contains_key(old) {
            return Err(Self::not_found(old));
        }
        let parent = new.parent().ok_or_else(|| Self::not_found(new))?;
        if !matches!(state.entries.get(parent), Some(MemEntry::Directory)) {
            return Err(Self::not_found(parent));
        }

        // Re-key the entry and every descendant; replaces any existing
        // destination, matching `std::fs::rename` overwrite semantics for
        // files.
        let moved: Vec<(PathBuf, MemEntry)> = state
            .entries
            .iter()
            .filter(|(p, _)| p.starts_with(old))
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        state.entries.retain(|p, _| !p.starts_with(old) && !p.starts_with(new));
        for (path, entry) in moved {
            let suffix = path.strip_prefix(old).expect("descendant of old path");
            let target = if suffix.as_os_str().is_empty() {
                new.to_path_buf()
            } else {
                new.join(suffix)
            };
            state.entries.insert(target, entry);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("remove");
        if !state.entries.contains_key(path) {
            return Err(Self::not_found(path));
        }
        state.entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory fs lock");
        state.count("copy");
        if !state.entries.contains_key(src) {
            return Err(Self::not_found(src));
        }
        let parent = dst.parent().ok_or_else(|| Self::not_found(dst))?;
        if !matches!(state.entries.get(parent), Some(MemEntry::Directory)) {
            return Err(Self::not_found(parent));
        }

        let copied: Vec<(PathBuf, MemEntry)> = state
            .entries
            .iter()
            .filter(|(p, _)| p.starts_with(src))
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        for (path, entry) in copied {
            let suffix = path.strip_prefix(src).expect("descendant of src path");
            let target = if suffix.as_os_str().is_empty() {
                dst.to_path_buf()
            } else {
                dst.join(suffix)
            };
            state.entries.insert(target, entry);
        }
        Ok(())
    }
}
