use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use arbor_vfs::{FileSystem, FsEntry};

use crate::error::FetchError;

/// Fetches one directory's immediate entries, filtered and sorted.
///
/// Sorting is deterministic and stable: directories before files, then
/// case-insensitive lexicographic by name. Listing the same unchanged
/// directory twice yields identical ordered entries.
#[derive(Clone)]
pub struct DirectoryLoader {
    fs: Arc<dyn FileSystem>,
    hidden: Vec<String>,
}

impl DirectoryLoader {
    pub fn new(fs: Arc<dyn FileSystem>, hidden: Vec<String>) -> Self {
        Self { fs, hidden }
    }

    pub fn list(&self, path: &Path) -> Result<Vec<FsEntry>, FetchError> {
        let mut entries = self.fs.read_dir(path).map_err(|source| FetchError {
            path: path.to_path_buf(),
            source,
        })?;
        entries.retain(|entry| !self.hidden.iter().any(|hidden| hidden == &entry.name));
        entries.sort_by(compare_entries);
        Ok(entries)
    }
}

fn compare_entries(a: &FsEntry, b: &FsEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use arbor_vfs::MemoryFs;

    fn loader(fs: MemoryFs) -> DirectoryLoader {
        DirectoryLoader::new(Arc::new(fs), vec![".git".to_string()])
    }

    #[test]
    fn directories_precede_files_case_insensitively() {
        let fs = MemoryFs::new("/ws");
        fs.add_file("/ws/Zeta.txt", b"");
        fs.add_file("/ws/alpha.txt", b"");
        fs.add_dir("/ws/src");
        fs.add_dir("/ws/Docs");

        let names: Vec<String> = loader(fs)
            .list(Path::new("/ws"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["Docs", "src", "alpha.txt", "Zeta.txt"]);
    }

    #[test]
    fn version_control_metadata_is_hidden() {
        let fs = MemoryFs::new("/ws");
        fs.add_dir("/ws/.git");
        fs.add_file("/ws/a.txt", b"");

        let names: Vec<String> = loader(fs)
            .list(Path::new("/ws"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["a.txt"]);
    }

    #[test]
    fn listing_is_idempotent() {
        let fs = MemoryFs::new("/ws");
        fs.add_dir("/ws/b");
        fs.add_file("/ws/a.txt", b"");
        let loader = loader(fs);

        let first = loader.list(Path::new("/ws")).unwrap();
        let second = loader.list(Path::new("/ws")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unreadable_directory_is_a_fetch_error() {
        let fs = MemoryFs::new("/ws");
        fs.add_dir("/ws/locked");
        fs.set_unreadable("/ws/locked");

        let err = loader(fs).list(Path::new("/ws/locked")).unwrap_err();
        assert_eq!(err.path, Path::new("/ws/locked"));
    }
}
