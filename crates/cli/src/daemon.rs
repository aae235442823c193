//! The watch-and-backup runtime
//!
//! Three tasks cooperate over one ordered event stream: the watcher's
//! poll loop produces change events on each tick, a one-shot seeder
//! enqueues synthetic creates for the tree's starting state, and the
//! dispatcher consumes the stream and writes snapshots.

use anyhow::{Context, Result};
use snapshot::{Dispatcher, PathMapper};
use watcher::Watcher;

use crate::config::Config;

/// Run the backup pipeline.
///
/// There is no clean-shutdown path here: the pipeline runs until the
/// process is killed or a snapshot write fails, in which case the
/// error propagates out and the process exits non-zero.
pub async fn run(config: Config) -> Result<()> {
    println!(
        "Watching {}, backing up to {} every {}",
        config.input.display(),
        config.output.display(),
        humantime::format_duration(config.interval)
    );

    let mut watcher = Watcher::new(&config.input);
    watcher.add_recursive().context("unable to watch input")?;

    // snapshot of the registered files, taken before polling starts
    let seed = watcher.initial_events();
    let (handle, stream) = watcher.start(config.interval);

    let mapper = PathMapper::new(&config.input, &config.output);
    let dispatcher = tokio::spawn(Dispatcher::new(mapper, stream).run());

    // initial full-tree backup: registration is complete, so every
    // known file goes through the pipeline once before the first tick
    let seeder = handle.sender();
    tokio::spawn(async move {
        for event in seed {
            if seeder.send(event).is_err() {
                break;
            }
        }
    });

    let result = dispatcher
        .await
        .context("dispatcher task panicked")?
        .context("backup failed");

    // the control handle must outlive the dispatcher; dropping it
    // earlier would stop the poll loop
    drop(handle);
    result
}
