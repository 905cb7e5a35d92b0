//! File watching.
//!
//! This module defines [`FileWatcher`], the watcher abstraction the explorer
//! engine consumes. The OS backend (currently a Notify-based implementation)
//! lives behind the `watch-notify` feature so the default build carries no
//! platform watcher dependency; deterministic tests use [`ManualWatcher`]
//! instead of sleeping on real OS watcher timing.
//!
//! # Event delivery
//!
//! Watchers deliver events as a `crossbeam_channel` stream returned by
//! [`FileWatcher::receiver`], so consumers can integrate them into their own
//! event loops without a particular async runtime. Asynchronous watcher
//! errors are delivered on the same stream (see [`WatchMessage`]).
//!
//! # Semantics
//!
//! Events are deliberately coarse: a [`WatchEvent::Changed`] means "something
//! under the watched root changed" with no reliable path or kind payload.
//! Consumers are expected to debounce bursts and reconcile against the
//! filesystem as the authoritative state, so backends are free to coalesce
//! and even drop events as long as at least one notification survives a
//! burst. A backend that lost track of changes entirely emits
//! [`WatchEvent::Rescan`], which consumers should treat the same way.

use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel as channel;

/// An event produced by a file watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something under the watched root changed. No path detail is
    /// guaranteed.
    Changed,
    /// The watcher dropped events due to overflow/backpressure; consumers
    /// should rescan the watched root.
    Rescan,
}

/// Message type delivered by a [`FileWatcher`].
pub type WatchMessage = io::Result<WatchEvent>;

/// Event-driven watcher abstraction.
///
/// At most one subscription per root is supported; watching an
/// already-watched root is an error left to the backend.
pub trait FileWatcher: Send {
    /// Begin watching `root` recursively.
    fn watch_root(&mut self, root: &Path) -> io::Result<()>;

    /// Stop watching `root`.
    fn unwatch_root(&mut self, root: &Path) -> io::Result<()>;

    /// Returns the receiver used to consume watcher events.
    fn receiver(&self) -> &channel::Receiver<WatchMessage>;
}

impl<W: ?Sized + FileWatcher> FileWatcher for Box<W> {
    fn watch_root(&mut self, root: &Path) -> io::Result<()> {
        self.as_mut().watch_root(root)
    }

    fn unwatch_root(&mut self, root: &Path) -> io::Result<()> {
        self.as_mut().unwatch_root(root)
    }

    fn receiver(&self) -> &channel::Receiver<WatchMessage> {
        self.as_ref().receiver()
    }
}

const MANUAL_WATCH_QUEUE_CAPACITY: usize = 1024;

/// Deterministic watcher implementation for tests.
///
/// Does not interact with the OS; callers inject events manually via
/// [`ManualWatcher::notify`] or a cloned [`ManualWatcherHandle`].
#[derive(Debug)]
pub struct ManualWatcher {
    tx: channel::Sender<WatchMessage>,
    rx: channel::Receiver<WatchMessage>,
    watch_calls: Vec<PathBuf>,
    unwatch_calls: Vec<PathBuf>,
}

/// Cloneable handle for injecting events into a [`ManualWatcher`] after it
/// has been moved into another owner (e.g. a watch bridge thread).
#[derive(Debug, Clone)]
pub struct ManualWatcherHandle {
    tx: channel::Sender<WatchMessage>,
}

impl ManualWatcherHandle {
    /// Inject a synthetic change notification.
    pub fn notify(&self) -> io::Result<()> {
        self.send(Ok(WatchEvent::Changed))
    }

    /// Inject a synthetic watcher event.
    pub fn push(&self, event: WatchEvent) -> io::Result<()> {
        self.send(Ok(event))
    }

    /// Inject an asynchronous watcher error.
    pub fn push_error(&self, error: io::Error) -> io::Result<()> {
        self.send(Err(error))
    }

    fn send(&self, msg: WatchMessage) -> io::Result<()> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(channel::TrySendError::Full(_)) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "watch queue is full",
            )),
            Err(channel::TrySendError::Disconnected(_)) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "watch receiver dropped",
            )),
        }
    }
}

impl Default for ManualWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualWatcher {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(MANUAL_WATCH_QUEUE_CAPACITY);
        Self {
            tx,
            rx,
            watch_calls: Vec::new(),
            unwatch_calls: Vec::new(),
        }
    }

    /// Returns a cloneable handle that can inject events even after the
    /// watcher has been moved into another owner.
    pub fn handle(&self) -> ManualWatcherHandle {
        ManualWatcherHandle {
            tx: self.tx.clone(),
        }
    }

    /// Inject a synthetic change notification.
    pub fn notify(&self) -> io::Result<()> {
        self.handle().notify()
    }

    /// Roots passed to [`FileWatcher::watch_root`] (in call order).
    pub fn watch_calls(&self) -> &[PathBuf] {
        &self.watch_calls
    }

    /// Roots passed to [`FileWatcher::unwatch_root`] (in call order).
    pub fn unwatch_calls(&self) -> &[PathBuf] {
        &self.unwatch_calls
    }
}

impl FileWatcher for ManualWatcher {
    fn watch_root(&mut self, root: &Path) -> io::Result<()> {
        self.watch_calls.push(root.to_path_buf());
        Ok(())
    }

    fn unwatch_root(&mut self, root: &Path) -> io::Result<()> {
        self.unwatch_calls.push(root.to_path_buf());
        Ok(())
    }

    fn receiver(&self) -> &channel::Receiver<WatchMessage> {
        &self.rx
    }
}

#[cfg(feature = "watch-notify")]
mod notify_impl {
    use super::*;

    use notify::{RecursiveMode, Watcher};

    const EVENTS_QUEUE_CAPACITY: usize = 1024;

    fn notify_error_to_io(err: notify::Error) -> io::Error {
        io::Error::other(err)
    }

    /// OS file watcher backed by `notify`.
    ///
    /// Every backend event collapses to [`WatchEvent::Changed`]; events
    /// flagged for rescan (overflow, dropped queues) become
    /// [`WatchEvent::Rescan`]. If the outbound queue is full the event is
    /// dropped: at least one notification is already pending, which is all
    /// the debouncing consumer needs.
    pub struct NotifyWatcher {
        watcher: notify::RecommendedWatcher,
        rx: channel::Receiver<WatchMessage>,
    }

    impl NotifyWatcher {
        pub fn new() -> io::Result<Self> {
            let (tx, rx) = channel::bounded::<WatchMessage>(EVENTS_QUEUE_CAPACITY);
            let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let msg = match res {
                    Ok(event) => {
                        if matches!(event.attrs.flag(), Some(notify::event::Flag::Rescan)) {
                            Ok(WatchEvent::Rescan)
                        } else {
                            Ok(WatchEvent::Changed)
                        }
                    }
                    Err(err) => Err(notify_error_to_io(err)),
                };
                let _ = tx.try_send(msg);
            })
            .map_err(notify_error_to_io)?;
            Ok(Self { watcher, rx })
        }
    }

    impl FileWatcher for NotifyWatcher {
        fn watch_root(&mut self, root: &Path) -> io::Result<()> {
            self.watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(notify_error_to_io)
        }

        fn unwatch_root(&mut self, root: &Path) -> io::Result<()> {
            self.watcher.unwatch(root).map_err(notify_error_to_io)
        }

        fn receiver(&self) -> &channel::Receiver<WatchMessage> {
            &self.rx
        }
    }
}

#[cfg(feature = "watch-notify")]
pub use notify_impl::NotifyWatcher;
