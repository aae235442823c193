//! Snapshot pipeline for bak
//!
//! This crate provides:
//! - Source-to-destination path mapping with timestamped filenames
//! - Byte-for-byte copying of regular files
//! - The event dispatch loop connecting a watcher to the copy pipeline

pub mod copy;
pub mod dispatch;
pub mod pathmap;

use std::io;
use std::path::PathBuf;

pub use copy::copy_file;
pub use dispatch::Dispatcher;
pub use pathmap::PathMapper;

/// Errors on the snapshot path. All of these are fatal to the backup
/// pipeline: there is no retry and no partial-success reporting.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("{0} is not a regular file")]
    NotRegularFile(PathBuf),

    #[error("{path} is not under the watch root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{0} has no filename segment")]
    NoFileName(PathBuf),

    #[error("unable to create output directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error copying {src} to {dst}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
}
