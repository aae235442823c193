//! Byte-for-byte copy of a regular file

use std::fs::File;
use std::io;
use std::path::Path;

use crate::SnapshotError;

/// Copy `src` to `dst`, returning the number of bytes written.
///
/// `src` must be a regular file; directories, symlinks and device
/// nodes are rejected before any destination file is created. The
/// destination is created or truncated in place, with no atomic
/// rename: a copy that fails midway can leave a partial file behind.
/// Source permissions, timestamps, and ownership are not preserved.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, SnapshotError> {
    let io_err = |source: io::Error| SnapshotError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    };

    let meta = std::fs::symlink_metadata(src).map_err(io_err)?;
    if !meta.file_type().is_file() {
        return Err(SnapshotError::NotRegularFile(src.to_path_buf()));
    }

    let mut reader = File::open(src).map_err(io_err)?;
    let mut writer = File::create(dst).map_err(io_err)?;
    io::copy(&mut reader, &mut writer).map_err(io_err)
}
