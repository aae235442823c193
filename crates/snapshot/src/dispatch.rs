//! Event dispatch loop
//!
//! Consumes the watcher's event stream and drives the copy pipeline.
//! Directories never reach the copier, nor do operations other than
//! create and write (the watcher is not expected to emit others toward
//! the pipeline, but the filter holds regardless). A failed directory
//! creation or copy ends the loop with an error; watcher-channel
//! errors are logged and skipped.

use std::fs;

use chrono::Local;
use tracing::{debug, info, warn};
use watcher::{ChangeEvent, EventStream, Op};

use crate::{copy_file, PathMapper, SnapshotError};

/// The backup pipeline's consuming end.
pub struct Dispatcher {
    mapper: PathMapper,
    stream: EventStream,
}

impl Dispatcher {
    pub fn new(mapper: PathMapper, stream: EventStream) -> Self {
        Self { mapper, stream }
    }

    /// Run until the stream closes or a snapshot write fails.
    ///
    /// Blocks on whichever arrives first: the next change event, a
    /// watcher error, or the terminal closed signal.
    pub async fn run(self) -> Result<(), SnapshotError> {
        let Dispatcher { mapper, stream } = self;
        let EventStream {
            mut events,
            mut errors,
            mut closed,
        } = stream;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => dispatch(&mapper, event)?,
                    None => break,
                },
                Some(err) = errors.recv() => {
                    warn!("error watching file: {err}");
                }
                _ = &mut closed => break,
            }
        }

        Ok(())
    }
}

fn dispatch(mapper: &PathMapper, event: ChangeEvent) -> Result<(), SnapshotError> {
    if event.is_dir {
        return Ok(());
    }
    if !matches!(event.op, Op::Create | Op::Write) {
        debug!(path = %event.path.display(), "skipping {:?} event", event.op);
        return Ok(());
    }

    let dst = mapper.destination(&event.path, Local::now().naive_local())?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|source| SnapshotError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let bytes = copy_file(&event.path, &dst)?;
    info!(
        "copied {} to {} ({} bytes)",
        event.path.display(),
        dst.display(),
        bytes
    );
    Ok(())
}
