use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl FsEntry {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, false)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path, true)
    }

    fn new(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            is_directory,
        }
    }
}

/// File system abstraction the explorer engine runs against.
///
/// The trait is intentionally small so it can be implemented for different
/// backends (local disk, remote mounts, in-memory test doubles). All
/// operations are fallible and report failures via `io::Error`; `remove` and
/// `copy` apply recursively to directories.
pub trait FileSystem: Send + Sync {
    /// Lists the immediate entries of a directory, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>>;

    /// Returns whether a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a file with the given contents. Fails if the parent directory
    /// is missing.
    fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Creates a single directory. Fails if the parent directory is missing.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Renames (moves) an entry. Directories move with their contents.
    fn rename(&self, old: &Path, new: &Path) -> io::Result<()>;

    /// Removes an entry; directories are removed recursively.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Copies an entry; directories are copied recursively.
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// Local OS file system implementation.
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
        let meta = fs::metadata(src)?;
        if !meta.is_dir() {
            fs::copy(src, dst)?;
            return Ok(());
        }

        tracing::debug!(src = %src.display(), dst = %dst.display(), "copying directory tree");
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let target = dst.join(entry.file_name());
            Self::copy_recursive(&entry.path(), &target)?;
        }
        Ok(())
    }
}

impl FileSystem for LocalFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let is_directory = entry.file_type()?.is_dir();
            out.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_directory,
            });
        }
        Ok(out)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn rename(&self, old: &Path, new: &Path) -> io::Result<()> {
        fs::rename(old, new)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if fs::metadata(path)?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        Self::copy_recursive(src, dst)
    }
}
