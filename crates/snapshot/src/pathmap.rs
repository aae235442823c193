//! Source-to-destination path mapping
//!
//! A source path's position relative to the watch root is mirrored
//! under the output root, with the wall-clock minute stamped onto the
//! filename segment. Two snapshots of the same file taken in different
//! minutes therefore never collide; distinct sources sharing a
//! basename, directory, and minute are not defended against.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::SnapshotError;

/// Timestamp prefix on the filename segment, minute precision.
const STAMP_FORMAT: &str = "%Y-%m-%d_%H.%M_";

/// Deterministic mapping from watched source paths to timestamped
/// destination paths.
#[derive(Debug, Clone)]
pub struct PathMapper {
    watch_root: PathBuf,
    output_root: PathBuf,
}

impl PathMapper {
    pub fn new(watch_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            watch_root: watch_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Destination for a snapshot of `source` taken at `now`.
    ///
    /// Relativization is structural, not a string-prefix strip: a
    /// sibling of the watch root whose name merely shares a prefix
    /// (`/data/abcdef` next to root `/data/abc`) is rejected rather
    /// than silently mangled. Watching a single file maps it directly
    /// under the output root.
    pub fn destination(&self, source: &Path, now: NaiveDateTime) -> Result<PathBuf, SnapshotError> {
        let rel = source
            .strip_prefix(&self.watch_root)
            .map_err(|_| SnapshotError::OutsideRoot {
                path: source.to_path_buf(),
                root: self.watch_root.clone(),
            })?;

        let name = source
            .file_name()
            .ok_or_else(|| SnapshotError::NoFileName(source.to_path_buf()))?;
        let stamped = format!("{}{}", now.format(STAMP_FORMAT), name.to_string_lossy());

        let base = match rel.parent() {
            Some(parent) => self.output_root.join(parent),
            None => self.output_root.clone(),
        };
        Ok(base.join(stamped))
    }
}
