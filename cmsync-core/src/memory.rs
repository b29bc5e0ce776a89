//! In-memory data source and sink.
//!
//! Both types are cheap to clone and clones share state, so a test can keep
//! one copy for assertions while another is moved into the sync loop.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::SourceError;
use crate::sink::{FileHandle, Sink};
use crate::source::DataSource;
use crate::types::{Entries, NamedObject, Namespace, ObjectName};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SourceState {
    objects: HashMap<(Namespace, ObjectName), Entries>,
    unreachable: HashSet<ObjectName>,
    fetched: Vec<(Namespace, ObjectName)>,
}

/// A [`DataSource`] backed by a map, recording every fetch it serves.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) an object.
    pub fn insert(&self, object: NamedObject) {
        lock(&self.state)
            .objects
            .insert((object.namespace, object.name), object.entries);
    }

    /// Make every fetch of `name` fail with a transport error.
    pub fn make_unreachable(&self, name: impl Into<ObjectName>) {
        lock(&self.state).unreachable.insert(name.into());
    }

    /// Every `(namespace, name)` fetched so far, in call order.
    pub fn fetched(&self) -> Vec<(Namespace, ObjectName)> {
        lock(&self.state).fetched.clone()
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, namespace: &Namespace, name: &ObjectName) -> Result<NamedObject, SourceError> {
        let mut state = lock(&self.state);
        state.fetched.push((namespace.clone(), name.clone()));
        if state.unreachable.contains(name) {
            return Err(SourceError::Transport(format!(
                "{namespace}/{name}: connection refused"
            )));
        }
        state
            .objects
            .get(&(namespace.clone(), name.clone()))
            .map(|entries| NamedObject::new(namespace.clone(), name.clone(), entries.clone()))
            .ok_or_else(|| SourceError::not_found(namespace, name))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// One file created through a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Default)]
struct SinkState {
    files: Vec<MemoryFile>,
    fail_create: HashSet<PathBuf>,
    fail_write: HashSet<PathBuf>,
}

/// A [`Sink`] that keeps every created file in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `create` for `path` with `PermissionDenied`.
    pub fn fail_create(&self, path: impl Into<PathBuf>) {
        lock(&self.state).fail_create.insert(path.into());
    }

    /// Accept `create` for `path`, but fail the write that follows.
    pub fn fail_write(&self, path: impl Into<PathBuf>) {
        lock(&self.state).fail_write.insert(path.into());
    }

    /// Every created file, in creation order.
    pub fn files(&self) -> Vec<MemoryFile> {
        lock(&self.state).files.clone()
    }

    /// Final content per path; later creates of the same path win.
    pub fn contents(&self) -> BTreeMap<PathBuf, String> {
        lock(&self.state)
            .files
            .iter()
            .map(|f| (f.path.clone(), f.content.clone()))
            .collect()
    }
}

impl Sink for MemorySink {
    type Handle = MemoryHandle;

    fn create(&mut self, path: &Path) -> io::Result<MemoryHandle> {
        let mut state = lock(&self.state);
        if state.fail_create.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot create {}", path.display()),
            ));
        }
        state.files.push(MemoryFile {
            path: path.to_path_buf(),
            content: String::new(),
        });
        Ok(MemoryHandle {
            state: self.state.clone(),
            index: state.files.len() - 1,
            fail: state.fail_write.contains(path),
        })
    }
}

/// Handle returned by [`MemorySink::create`].
#[derive(Debug)]
pub struct MemoryHandle {
    state: Arc<Mutex<SinkState>>,
    index: usize,
    fail: bool,
}

impl FileHandle for MemoryHandle {
    fn write_content(&mut self, content: &str) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::other("no space left on device"));
        }
        let mut state = lock(&self.state);
        match state.files.get_mut(self.index) {
            Some(file) => {
                file.content = content.to_owned();
                Ok(content.len())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "file was cleared from the sink",
            )),
        }
    }
}
