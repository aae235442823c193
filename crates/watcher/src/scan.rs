//! Recursive watch set and the rescan-and-diff polling pass
//!
//! The watch set is a map from path to cached metadata. Each polling
//! pass re-walks the tree, diffs mtimes against the cache, and
//! replaces the cache wholesale. A fresh walk per pass is what lets
//! files inside a brand-new subdirectory surface in the same pass that
//! discovers the subdirectory itself.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::{ChangeEvent, Op, WatchError};

/// Cached metadata for one tracked path.
#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    is_dir: bool,
    modified: SystemTime,
}

/// The set of tracked paths under a single watch root.
pub struct WatchSet {
    root: PathBuf,
    entries: HashMap<PathBuf, EntryMeta>,
}

/// Everything one polling pass produced.
pub struct PollPass {
    /// Changes in walk order, removals last
    pub events: Vec<ChangeEvent>,
    /// Transient per-file failures; the pass itself still completes
    pub errors: Vec<WatchError>,
}

impl WatchSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk the tree rooted at the watch root and register every file
    /// and directory. Idempotent: already-known paths keep their cached
    /// metadata and no events result from re-registration.
    pub fn add_recursive(&mut self) -> Result<(), WatchError> {
        if !self.root.exists() {
            return Err(WatchError::RootNotFound(self.root.clone()));
        }

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|err| walk_error(&self.root, err))?;
            let meta = stat_entry(&entry)?;
            self.entries.entry(entry.into_path()).or_insert(meta);
        }

        debug!(
            root = %self.root.display(),
            entries = self.entries.len(),
            "registered watch set"
        );
        Ok(())
    }

    /// One rescan-and-diff pass.
    ///
    /// Unknown paths are reported as `Create` (and tracked from now
    /// on), known paths with a changed mtime as `Write`, vanished
    /// paths as `Remove` (and dropped, so a later re-creation is a
    /// fresh `Create`). Rapid repeated writes to one file between two
    /// passes collapse into a single `Write`.
    pub fn poll(&mut self) -> PollPass {
        let mut events = Vec::new();
        let mut errors = Vec::new();
        let mut seen: HashMap<PathBuf, EntryMeta> = HashMap::with_capacity(self.entries.len());

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push(walk_error(&self.root, err));
                    continue;
                }
            };
            let meta = match stat_entry(&entry) {
                Ok(meta) => meta,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            let path = entry.into_path();

            match self.entries.get(&path) {
                None => events.push(ChangeEvent {
                    op: Op::Create,
                    path: path.clone(),
                    is_dir: meta.is_dir,
                }),
                Some(prev) if prev.modified != meta.modified => events.push(ChangeEvent {
                    op: Op::Write,
                    path: path.clone(),
                    is_dir: meta.is_dir,
                }),
                Some(_) => {}
            }
            seen.insert(path, meta);
        }

        for (path, prev) in &self.entries {
            if !seen.contains_key(path) {
                events.push(ChangeEvent {
                    op: Op::Remove,
                    path: path.clone(),
                    is_dir: prev.is_dir,
                });
            }
        }

        self.entries = seen;
        PollPass { events, errors }
    }

    /// Synthetic `Create` events for every registered regular file.
    pub fn initial_events(&self) -> Vec<ChangeEvent> {
        self.entries
            .iter()
            .filter(|(_, meta)| !meta.is_dir)
            .map(|(path, meta)| ChangeEvent {
                op: Op::Create,
                path: path.clone(),
                is_dir: meta.is_dir,
            })
            .collect()
    }
}

fn stat_entry(entry: &walkdir::DirEntry) -> Result<EntryMeta, WatchError> {
    let meta = entry
        .metadata()
        .map_err(|err| walk_error(entry.path(), err))?;
    Ok(EntryMeta {
        is_dir: meta.is_dir(),
        // mtime is unavailable on some exotic platforms; a constant
        // stand-in just means changes there surface as creates/removes
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    })
}

fn walk_error(fallback: &Path, err: walkdir::Error) -> WatchError {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    let kind = err.io_error().map(io::Error::kind);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
    match kind {
        Some(io::ErrorKind::PermissionDenied) => WatchError::Permission { path, source },
        _ => WatchError::Stat { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn bump_mtime(path: &Path, offset_secs: u64) {
        let later = SystemTime::now() + Duration::from_secs(offset_secs);
        set_file_mtime(path, FileTime::from_system_time(later)).unwrap();
    }

    #[test]
    fn add_recursive_registers_tree() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        // root dir + a.txt + sub + sub/b.txt
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn add_recursive_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let mut set = WatchSet::new(dir.path().join("nope"));
        assert!(matches!(
            set.add_recursive(),
            Err(WatchError::RootNotFound(_))
        ));
    }

    #[test]
    fn re_registration_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();
        let before = set.len();
        set.add_recursive().unwrap();
        assert_eq!(set.len(), before);

        // no spurious events for unchanged files either
        let pass = set.poll();
        assert!(pass.events.is_empty());
        assert!(pass.errors.is_empty());
    }

    #[test]
    fn poll_reports_new_file_as_create() {
        let dir = TempDir::new().unwrap();
        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        fs::write(dir.path().join("new.txt"), b"new").unwrap();
        let pass = set.poll();

        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Create);
        assert!(pass.events[0].path.ends_with("new.txt"));
        assert!(!pass.events[0].is_dir);
    }

    #[test]
    fn poll_reports_mtime_change_as_write() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        bump_mtime(&file, 5);
        let pass = set.poll();

        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Write);
        assert!(pass.events[0].path.ends_with("a.txt"));
    }

    #[test]
    fn poll_tracks_new_subdirectory_contents_in_one_pass() {
        let dir = TempDir::new().unwrap();
        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.txt"), b"inner").unwrap();

        let pass = set.poll();
        let creates: Vec<_> = pass
            .events
            .iter()
            .filter(|ev| ev.op == Op::Create)
            .collect();
        assert_eq!(creates.len(), 2);
        assert!(creates.iter().any(|ev| ev.path.ends_with("sub") && ev.is_dir));
        assert!(creates
            .iter()
            .any(|ev| ev.path.ends_with("sub/inner.txt") && !ev.is_dir));

        // the new contents are tracked from now on
        let file = dir.path().join("sub/inner.txt");
        bump_mtime(&file, 5);
        let pass = set.poll();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Write);
    }

    #[test]
    fn poll_reports_vanished_path_as_remove() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("gone.txt");
        fs::write(&file, b"x").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        fs::remove_file(&file).unwrap();
        let pass = set.poll();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Remove);

        // re-creation after removal is a fresh create
        fs::write(&file, b"y").unwrap();
        let pass = set.poll();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Create);
    }

    #[test]
    fn rapid_writes_collapse_to_one_event_per_pass() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("busy.txt");
        fs::write(&file, b"1").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        fs::write(&file, b"22").unwrap();
        bump_mtime(&file, 1);
        fs::write(&file, b"333").unwrap();
        bump_mtime(&file, 2);
        fs::write(&file, b"4444").unwrap();
        bump_mtime(&file, 3);

        let pass = set.poll();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Write);
    }

    #[test]
    fn watching_a_single_file_works() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, b"only").unwrap();

        let mut set = WatchSet::new(&file);
        set.add_recursive().unwrap();
        assert_eq!(set.len(), 1);

        bump_mtime(&file, 5);
        let pass = set.poll();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.events[0].op, Op::Write);
        assert_eq!(pass.events[0].path, file);
    }

    #[test]
    fn initial_events_cover_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let mut set = WatchSet::new(dir.path());
        set.add_recursive().unwrap();

        let seed = set.initial_events();
        assert_eq!(seed.len(), 2);
        assert!(seed.iter().all(|ev| ev.op == Op::Create && !ev.is_dir));
    }
}
