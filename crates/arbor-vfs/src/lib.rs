//! Filesystem collaborators for the Arbor workspace explorer.
//!
//! This crate owns the two external contracts the tree engine runs against:
//! - Reading and mutating entries on a file system ([`FileSystem`], with a
//!   local-disk implementation and an in-memory double for tests).
//! - Receiving coarse change notifications for a watched root
//!   ([`FileWatcher`], with a deterministic manual watcher and an optional
//!   `notify`-backed OS watcher behind the `watch-notify` feature).

mod fs;
mod memory;
mod watch;

pub use fs::{FileSystem, FsEntry, LocalFs};
pub use memory::MemoryFs;
pub use watch::{FileWatcher, ManualWatcher, ManualWatcherHandle, WatchEvent, WatchMessage};

#[cfg(feature = "watch-notify")]
pub use watch::NotifyWatcher;
