//! Access to the directory that holds segment files.
//!
//! The index never touches the filesystem directly; it goes through a
//! [`SegmentStore`]. [`FsStore`] is the real directory, [`MemoryStore`] is an
//! in-memory stand-in with failure injection for tests and simulations.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use rb_core::segment::is_segment_file_name;

/// What the index needs to know about a file on discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Storage operations used by scanning and retention.
///
/// Calls are synchronous and short; they run while the index write lock is
/// held so a rename or delete is never observed half-done by readers.
pub trait SegmentStore: Send + Sync + fmt::Debug {
    /// Directory the segments live in.
    fn dir(&self) -> &Path;

    /// Segment candidates (`segment_*.mp4`) in the directory, sorted by name.
    fn list(&self) -> io::Result<Vec<PathBuf>>;

    fn metadata(&self, path: &Path) -> io::Result<FileMeta>;

    fn exists(&self, path: &Path) -> bool;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Create the directory (and parents) if missing.
    fn ensure_dir(&self) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

/// A real directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SegmentStore for FsStore {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn list(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if !is_segment_file_name(&name.to_string_lossy()) {
                continue;
            }
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        let meta = std::fs::metadata(path)?;
        Ok(FileMeta {
            size: meta.len(),
            modified: DateTime::<Utc>::from(meta.modified()?),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, FileMeta>,
    fail_list: bool,
    fail_rename: bool,
    fail_remove: bool,
    fail_metadata: Vec<PathBuf>,
}

/// In-memory segment directory.
///
/// Files are plain `(size, mtime)` records keyed by path. Individual
/// operations can be told to fail to exercise the error paths of scanning and
/// retention.
#[derive(Debug)]
pub struct MemoryStore {
    dir: PathBuf,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Add (or overwrite) a file named `name` inside the store directory.
    pub fn insert(&self, name: &str, size: u64, modified: DateTime<Utc>) -> PathBuf {
        let path = self.dir.join(name);
        self.state
            .lock()
            .files
            .insert(path.clone(), FileMeta { size, modified });
        path
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state.lock().files.contains_key(path)
    }

    /// File names currently present, sorted.
    pub fn file_names(&self) -> Vec<String> {
        self.state
            .lock()
            .files
            .keys()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_size(&self) -> u64 {
        self.state.lock().files.values().map(|m| m.size).sum()
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    pub fn fail_rename(&self, fail: bool) {
        self.state.lock().fail_rename = fail;
    }

    pub fn fail_remove(&self, fail: bool) {
        self.state.lock().fail_remove = fail;
    }

    /// Make `metadata` fail for one path.
    pub fn fail_metadata_for(&self, path: impl Into<PathBuf>) {
        self.state.lock().fail_metadata.push(path.into());
    }
}

fn injected(op: &str) -> io::Error {
    io::Error::other(format!("injected {op} failure"))
}

impl SegmentStore for MemoryStore {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn list(&self) -> io::Result<Vec<PathBuf>> {
        let state = self.state.lock();
        if state.fail_list {
            return Err(injected("list"));
        }
        Ok(state
            .files
            .keys()
            .filter(|p| {
                p.parent() == Some(self.dir.as_path())
                    && p.file_name()
                        .is_some_and(|n| is_segment_file_name(&n.to_string_lossy()))
            })
            .cloned()
            .collect())
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        let state = self.state.lock();
        if state.fail_metadata.iter().any(|p| p == path) {
            return Err(injected("metadata"));
        }
        state
            .files
            .get(path)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn exists(&self, path: &Path) -> bool {
        self.contains(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_rename {
            return Err(injected("rename"));
        }
        let meta = state
            .files
            .remove(from)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        state.files.insert(to.to_path_buf(), meta);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_remove {
            return Err(injected("remove"));
        }
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn ensure_dir(&self) -> io::Result<()> {
        Ok(())
    }
}
