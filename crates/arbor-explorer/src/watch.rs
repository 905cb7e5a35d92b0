//! Bridges a [`FileWatcher`] to the tree engine.
//!
//! Watch notifications are coarse and bursty (a `git checkout` emits
//! hundreds), so the bridge runs one background thread that coalesces them
//! with a cancel-and-reschedule debounce timer and emits a single
//! [`ReconcileRequest`] per quiet window. The bridge never touches the tree:
//! the session drains the request channel on its own thread and runs the
//! reconcile there.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use arbor_vfs::FileWatcher;
use crossbeam_channel as channel;

const REQUEST_QUEUE_CAPACITY: usize = 16;

/// One coalesced "the tree should reconcile now" signal.
///
/// Generations increase monotonically per bridge; a consumer that drains
/// several queued requests at once reconciles once and remembers the highest
/// generation it applied, so stale queued requests are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub generation: u64,
}

enum Command {
    Schedule(Duration),
    Shutdown,
}

/// Owns the watch subscription for one workspace root.
///
/// Acquired on workspace open; dropping the bridge stops the debounce thread
/// and releases the underlying watch.
pub struct WatchBridge {
    root: PathBuf,
    commands: channel::Sender<Command>,
    requests: channel::Receiver<ReconcileRequest>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WatchBridge {
    /// Registers a watch on `root` and starts the debounce thread. `window`
    /// is the quiet period required after the last notification before a
    /// reconcile request is emitted.
    pub fn subscribe<W>(mut watcher: W, root: &Path, window: Duration) -> io::Result<Self>
    where
        W: FileWatcher + 'static,
    {
        watcher.watch_root(root)?;
        let (command_tx, command_rx) = channel::unbounded();
        let (request_tx, request_rx) = channel::bounded(REQUEST_QUEUE_CAPACITY);
        let thread_root = root.to_path_buf();
        let thread = thread::Builder::new()
            .name("arbor-watch-bridge".to_string())
            .spawn(move || run_bridge_loop(watcher, thread_root, window, command_rx, request_tx))?;
        Ok(Self {
            root: root.to_path_buf(),
            commands: command_tx,
            requests: request_rx,
            thread: Some(thread),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Emitted reconcile requests, ready to be drained by the consumer.
    pub fn requests(&self) -> &channel::Receiver<ReconcileRequest> {
        &self.requests
    }

    /// Arms (or re-arms) the debounce timer to fire after `delay`,
    /// superseding any pending deadline. Used for the deferred
    /// post-mutation reconcile.
    pub fn schedule_reconcile(&self, delay: Duration) {
        let _ = self.commands.send(Command::Schedule(delay));
    }
}

impl Drop for WatchBridge {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_bridge_loop<W: FileWatcher>(
    mut watcher: W,
    root: PathBuf,
    window: Duration,
    commands: channel::Receiver<Command>,
    requests: channel::Sender<ReconcileRequest>,
) {
    let mut events = watcher.receiver().clone();
    let mut deadline: Option<Instant> = None;
    let mut generation: u64 = 0;

    loop {
        let timer = match deadline {
            Some(at) => channel::at(at),
            None => channel::never(),
        };
        channel::select! {
            recv(events) -> msg => match msg {
                Ok(Ok(_event)) => {
                    // Changed and Rescan debounce identically; the reconcile
                    // re-reads every expanded directory either way.
                    deadline = Some(Instant::now() + window);
                }
                Ok(Err(err)) => {
                    tracing::warn!(root = %root.display(), error = %err, "watcher error; reconciling");
                    deadline = Some(Instant::now() + window);
                }
                Err(_) => {
                    // Watcher stream closed; no retries. The workspace stops
                    // receiving updates until it is reopened.
                    tracing::debug!(root = %root.display(), "watch stream closed");
                    events = channel::never();
                }
            },
            recv(commands) -> cmd => match cmd {
                Ok(Command::Schedule(delay)) => {
                    deadline = Some(Instant::now() + delay);
                }
                Ok(Command::Shutdown) | Err(_) => break,
            },
            recv(timer) -> _ => {
                deadline = None;
                generation += 1;
                match requests.try_send(ReconcileRequest { generation }) {
                    Ok(()) => {}
                    // A full queue already carries an undrained request.
                    Err(channel::TrySendError::Full(_)) => {}
                    Err(channel::TrySendError::Disconnected(_)) => break,
                }
            }
        }
    }

    if let Err(err) = watcher.unwatch_root(&root) {
        tracing::debug!(root = %root.display(), error = %err, "failed to release watch");
    }
}
