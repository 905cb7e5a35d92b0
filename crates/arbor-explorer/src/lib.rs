//! Workspace tree engine for a file explorer.
//!
//! Maintains a lazily loaded in-memory mirror of a workspace directory:
//! directories are fetched only when expanded, user edits are applied
//! optimistically after the filesystem confirms them, and a debounced watch
//! bridge plus deep reconciliation keep the mirror consistent with disk as
//! the authoritative state.
//!
//! [`WorkspaceSession`] is the entry point; one session per open workspace.
//! Filesystem access and watching go through the traits in [`arbor_vfs`], so
//! the engine is testable against an in-memory filesystem and a manual
//! watcher.

mod clipboard;
mod config;
mod error;
mod loader;
mod mutation;
mod selection;
mod session;
mod tree;
mod watch;

pub use clipboard::{Clipboard, ClipboardEntry};
pub use config::ExplorerConfig;
pub use error::{DeleteReport, FetchError, MutationError, RevealError};
pub use loader::DirectoryLoader;
pub use mutation::{
    EntryKind, MutationCoordinator, PendingTransfer, TransferKind, TransferOutcome,
};
pub use selection::{flatten, Activation, Selection};
pub use session::{ExplorerHost, NullHost, PasteOutcome, WorkspaceSession};
pub use tree::{FileTree, Node};
pub use watch::{ReconcileRequest, WatchBridge};
