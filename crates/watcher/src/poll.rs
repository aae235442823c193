//! Interval-driven polling loop
//!
//! Runs one poll-and-diff pass per timer tick and pushes the results
//! into the shared event stream. Nothing is emitted between ticks, so
//! a burst of writes to one file amortizes into at most one event per
//! interval.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::scan::WatchSet;
use crate::{ChangeEvent, WatchError};

/// The interval scheduler driving a watch set.
pub struct Poller {
    set: WatchSet,
    every: Duration,
    event_tx: mpsc::UnboundedSender<ChangeEvent>,
    error_tx: mpsc::UnboundedSender<WatchError>,
    closed_tx: oneshot::Sender<()>,
    close_rx: oneshot::Receiver<()>,
}

impl Poller {
    pub(crate) fn new(
        set: WatchSet,
        every: Duration,
        event_tx: mpsc::UnboundedSender<ChangeEvent>,
        error_tx: mpsc::UnboundedSender<WatchError>,
        closed_tx: oneshot::Sender<()>,
        close_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            set,
            every,
            event_tx,
            error_tx,
            closed_tx,
            close_rx,
        }
    }

    /// Run until closed or until the event consumer goes away, then
    /// fire the terminal closed signal.
    pub async fn run(self) {
        let Poller {
            mut set,
            every,
            event_tx,
            error_tx,
            closed_tx,
            mut close_rx,
        } = self;

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            root = %set.root().display(),
            "polling every {:?}", every
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let pass = set.poll();
                    if !pass.events.is_empty() {
                        debug!(events = pass.events.len(), "poll pass found changes");
                    }
                    for err in pass.errors {
                        if error_tx.send(err).is_err() {
                            return;
                        }
                    }
                    for event in pass.events {
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                _ = &mut close_rx => break,
            }
        }

        let _ = closed_tx.send(());
    }
}
