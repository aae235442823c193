//! Poll-based file system watching for bak
//!
//! This crate provides:
//! - A recursive watch set over a file or directory tree
//! - Interval-gated rescan-and-diff change detection
//! - A single ordered event stream (multiple senders, one receiver)
//! - A terminal closed signal for shutdown

pub mod poll;
pub mod scan;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

pub use poll::Poller;
pub use scan::WatchSet;

/// Kind of change detected during a polling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Path was not previously known to the watch set
    Create,
    /// Path's modification time changed since the last pass
    Write,
    /// Path vanished since the last pass
    Remove,
}

/// A reported filesystem change.
///
/// Every emitted path is a descendant of the watch root (only the root
/// is ever walked). Events are produced once per polling pass and
/// consumed once downstream.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub op: Op,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Errors surfaced by the watch set.
///
/// `RootNotFound` and `Permission` during initial registration are
/// setup failures; errors reported on the error channel during
/// steady-state polling are transient and non-fatal.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watch root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("permission denied while scanning {path}")]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {path}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Receiving half of a started watcher, handed to the event consumer.
pub struct EventStream {
    /// Ordered change events, one entry per changed path per pass
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    /// Transient per-file errors encountered while polling
    pub errors: mpsc::UnboundedReceiver<WatchError>,
    /// Fires once, after the poll loop has stopped for good
    pub closed: oneshot::Receiver<()>,
}

/// Control handle for a started watcher.
///
/// Dropping the handle stops the poll loop, so the embedding process
/// must keep it alive for as long as events are wanted.
pub struct WatcherHandle {
    event_tx: mpsc::UnboundedSender<ChangeEvent>,
    close_tx: oneshot::Sender<()>,
}

impl WatcherHandle {
    /// Clone of the event sender, for enqueueing synthetic events into
    /// the same ordered stream the poll loop feeds.
    pub fn sender(&self) -> mpsc::UnboundedSender<ChangeEvent> {
        self.event_tx.clone()
    }

    /// Stop the poll loop. The stream's closed signal fires once the
    /// loop has exited; no events are produced after that.
    pub fn close(self) {
        let _ = self.close_tx.send(());
    }
}

/// Recursive watcher over a file or directory tree.
pub struct Watcher {
    set: WatchSet,
}

impl Watcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            set: WatchSet::new(root),
        }
    }

    /// Walk the tree and register every file and directory.
    pub fn add_recursive(&mut self) -> Result<(), WatchError> {
        self.set.add_recursive()
    }

    /// Synthetic `Create` events for every regular file currently
    /// registered. Used to seed an initial full-tree snapshot after
    /// registration completes.
    pub fn initial_events(&self) -> Vec<ChangeEvent> {
        self.set.initial_events()
    }

    /// Start the interval-driven poll loop on the current runtime,
    /// consuming the watcher. One poll-and-diff pass runs per tick;
    /// nothing is emitted between ticks.
    pub fn start(self, interval: Duration) -> (WatcherHandle, EventStream) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        let (closed_tx, closed) = oneshot::channel();
        let (close_tx, close_rx) = oneshot::channel();

        let poller = Poller::new(
            self.set,
            interval,
            event_tx.clone(),
            error_tx,
            closed_tx,
            close_rx,
        );
        tokio::spawn(poller.run());

        (
            WatcherHandle { event_tx, close_tx },
            EventStream {
                events,
                errors,
                closed,
            },
        )
    }
}
