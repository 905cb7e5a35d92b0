use std::io;
use std::path::PathBuf;

/// A directory listing failed.
///
/// Non-fatal: callers leave the affected node unloaded and move on.
#[derive(Debug, thiserror::Error)]
#[error("failed to list {}: {source}", path.display())]
pub struct FetchError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A create/rename/delete/move/copy operation failed.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("invalid entry name {name:?}")]
    InvalidName { name: String },

    #[error("no such entry in the tree: {}", path.display())]
    UnknownPath { path: PathBuf },

    #[error("cannot move or copy {} into itself or a descendant ({})", source_path.display(), dest.display())]
    DestinationInsideSource {
        source_path: PathBuf,
        dest: PathBuf,
    },

    #[error("source and destination are the same location: {}", path.display())]
    SameLocation { path: PathBuf },

    #[error("{op} failed for {}: {source}", path.display())]
    Fs {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a multi-path delete.
///
/// Partial failure is expected: every path that succeeded has been removed
/// from the tree, failures are reported alongside without aborting the batch.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, MutationError)>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `reveal` could not navigate to the requested path.
#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    #[error("{} is outside the workspace root {}", path.display(), root.display())]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("{} does not exist in the workspace", path.display())]
    NotFound { path: PathBuf },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
