//! Core store type, its builder, and the write scheduler.

use crate::commit::{CommitResult, WriteOutcome};
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::notify::{ChangeNotifier, ChangeStream};
use crate::persist;
use crate::serializer::{JsonSerializer, Serializer};
use crate::value::{PrefMap, PrefValue, Value};
use crate::writer::{Continuation, Job, WriteQueue};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

pub(crate) enum LoadState {
    Pending,
    Ready,
    Failed(String),
}

/// Everything guarded by the store's state lock.
pub(crate) struct State {
    pub(crate) load: LoadState,
    pub(crate) map: Arc<PrefMap>,
    pub(crate) memory_generation: u64,
    pub(crate) pending_writes: usize,
}

impl State {
    pub(crate) fn check_loaded(&self) -> Result<()> {
        match &self.load {
            LoadState::Ready => Ok(()),
            LoadState::Pending => Err(Error::NotLoaded),
            LoadState::Failed(reason) => Err(Error::LoadFailed(reason.clone())),
        }
    }
}

pub(crate) struct Shared {
    pub(crate) path: PathBuf,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) state: Mutex<State>,
    loaded: Condvar,
    /// Last generation known to be on disk. Held for the whole physical write,
    /// so it also serializes writers. Lock order: disk, then state.
    disk_generation: Mutex<u64>,
    pub(crate) notifier: ChangeNotifier,
    /// Held from the end of a commit-to-memory until its keys are emitted.
    /// Lock order: state, then emitting.
    pub(crate) emitting: Mutex<()>,
}

/// A persistent preference store backed by one JSON file.
///
/// Cheap to clone; clones share the same map, generations and writer thread.
/// Reads are served from memory. Changes go through an [`Editor`]. Obtain
/// stores from a [`Registry`](crate::Registry) so every caller of one path
/// shares one instance:
///
/// ```rust,no_run
/// use json_prefs::Registry;
///
/// let registry = Registry::new();
/// let store = registry.open("settings.json").unwrap();
/// store.edit().unwrap().put("volume", 7).commit();
/// assert_eq!(store.get("volume", 0_i64).unwrap(), 7);
/// ```
#[derive(Clone)]
pub struct Store {
    pub(crate) shared: Arc<Shared>,
    queue: Arc<WriteQueue>,
}

impl Store {
    /// Open an unmanaged store at `path` with default options, loading it
    /// before returning.
    ///
    /// Every call builds a new, independent instance. Two unmanaged stores on
    /// the same file do not see each other's changes and the later write wins
    /// on disk. Use [`Registry::open`](crate::Registry::open) unless this
    /// handle is the only one for its file.
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        Self::builder(path).build()
    }

    /// Start configuring a new unmanaged store (see [`open`](Self::open)).
    /// Call [`.build()`](StoreBuilder::build) when ready.
    pub fn builder(path: impl AsRef<Path>) -> StoreBuilder {
        StoreBuilder::new(path)
    }

    /// Block until the initial load has finished. Returns the load outcome.
    pub fn wait_loaded(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        while matches!(state.load, LoadState::Pending) {
            self.shared.loaded.wait(&mut state);
        }
        state.check_loaded()
    }

    // ---- reads ----

    /// The raw value under `key`, or `None` if absent.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let state = self.shared.state.lock();
        state.check_loaded()?;
        Ok(state.map.get(key).cloned())
    }

    /// Typed read. Returns `default` if the key is absent and
    /// [`Error::TypeMismatch`] if it holds another kind of value.
    pub fn get<T: PrefValue>(&self, key: &str, default: T) -> Result<T> {
        let Some(value) = self.get_value(key)? else {
            return Ok(default);
        };
        let found = value.kind();
        T::from_value(value).ok_or_else(|| Error::TypeMismatch {
            key: key.to_owned(),
            expected: T::KIND,
            found,
        })
    }

    /// [`get`](Self::get) for strings.
    pub fn get_string(&self, key: &str, default: &str) -> Result<String> {
        self.get(key, default.to_owned())
    }

    /// [`get`](Self::get) for integers.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        self.get(key, default)
    }

    /// [`get`](Self::get) for floats.
    pub fn get_float(&self, key: &str, default: f64) -> Result<f64> {
        self.get(key, default)
    }

    /// [`get`](Self::get) for booleans.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.get(key, default)
    }

    /// [`get`](Self::get) for string lists.
    pub fn get_string_list(&self, key: &str, default: Vec<String>) -> Result<Vec<String>> {
        self.get(key, default)
    }

    /// `true` if the key exists.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let state = self.shared.state.lock();
        state.check_loaded()?;
        Ok(state.map.contains_key(key))
    }

    /// Copy of the whole map.
    pub fn all(&self) -> Result<PrefMap> {
        let state = self.shared.state.lock();
        state.check_loaded()?;
        Ok((*state.map).clone())
    }

    /// Snapshot of all keys, in no particular order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let state = self.shared.state.lock();
        state.check_loaded()?;
        Ok(state.map.keys().cloned().collect())
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize> {
        let state = self.shared.state.lock();
        state.check_loaded()?;
        Ok(state.map.len())
    }

    /// `true` when the store has no entries.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    // ---- writes ----

    /// Start a batch of changes.
    pub fn edit(&self) -> Result<Editor<'_>> {
        self.shared.state.lock().check_loaded()?;
        Ok(Editor::new(self))
    }

    /// Subscribe to the keys changed by later commits.
    pub fn changes(&self) -> ChangeStream {
        self.shared.notifier.subscribe()
    }

    /// Block until every write queued so far has finished.
    ///
    /// Commits that write inline on another thread are not covered; they
    /// finish before their own `commit()` returns.
    pub fn wait_for_pending_writes(&self) {
        let (tx, rx) = mpsc::channel();
        let barrier: Job = Box::new(move || {
            let _ = tx.send(());
        });
        if self.queue.submit(barrier).is_ok() {
            let _ = rx.recv();
        }
    }

    // ---- diagnostics ----

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Generation of the in-memory state.
    #[must_use]
    pub fn memory_generation(&self) -> u64 {
        self.shared.state.lock().memory_generation
    }

    /// Generation last written to disk. Blocks while a write is in progress.
    #[must_use]
    pub fn disk_generation(&self) -> u64 {
        *self.shared.disk_generation.lock()
    }

    /// Writes queued or in flight.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.shared.state.lock().pending_writes
    }

    // ---- internal ----

    /// Schedule the physical write for `result`.
    ///
    /// Without a continuation the caller is blocking on the result, and if this
    /// is the only write outstanding it runs right here on the caller's thread.
    /// Everything else goes to the writer thread.
    pub(crate) fn enqueue_write(&self, result: Arc<CommitResult>, continuation: Option<Continuation>) {
        let blocking = continuation.is_none();
        let shared = Arc::clone(&self.shared);
        let job: Job = Box::new(move || {
            let outcome = write_to_disk(&shared, &result, blocking);
            shared.state.lock().pending_writes -= 1;
            result.complete(outcome);
            if let Some(c) = continuation {
                c(outcome);
            }
        });

        if blocking && self.shared.state.lock().pending_writes == 1 {
            job();
            return;
        }
        if let Err(job) = self.queue.submit(job) {
            log::warn!(
                "writer thread for {} is gone, writing inline",
                self.shared.path.display()
            );
            job();
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.shared.path)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

fn write_to_disk(shared: &Shared, result: &CommitResult, blocking: bool) -> WriteOutcome {
    let mut disk_generation = shared.disk_generation.lock();
    let generation = result.generation();
    if *disk_generation >= generation {
        log::trace!(
            "generation {generation} already on disk ({})",
            *disk_generation
        );
        return WriteOutcome::SKIPPED;
    }
    if !blocking {
        // A later commit bumped the generation and queued its own write, which
        // will carry this state along. The newest write never hits this branch.
        let current = shared.state.lock().memory_generation;
        if generation < current {
            log::trace!("generation {generation} superseded by {current}, skipping");
            return WriteOutcome::SKIPPED;
        }
    }

    match persist::write_with_backup(&shared.path, result.snapshot(), shared.serializer.as_ref()) {
        Ok(()) => {
            *disk_generation = generation;
            log::debug!("wrote generation {generation} to {}", shared.path.display());
            WriteOutcome::WRITTEN
        }
        Err(e) => {
            log::warn!(
                "writing generation {generation} to {} failed: {e}",
                shared.path.display()
            );
            WriteOutcome::FAILED
        }
    }
}

fn bootstrap(shared: &Shared) {
    let loaded = persist::load(&shared.path, shared.serializer.as_ref());
    let mut state = shared.state.lock();
    match loaded {
        Ok(map) => {
            log::debug!("loaded {} keys from {}", map.len(), shared.path.display());
            state.map = Arc::new(map);
            state.load = LoadState::Ready;
        }
        Err(e) => {
            log::error!("failed to load {}: {e}", shared.path.display());
            state.load = LoadState::Failed(e.to_string());
        }
    }
    shared.loaded.notify_all();
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Settings shared by every store a [`Registry`](crate::Registry) opens.
#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Write human-readable JSON with indentation (default: compact).
    pub pretty: bool,
    /// Load on a background thread and return before the load finishes
    /// (default: load before returning).
    pub load_in_background: bool,
    /// Custom serializer. Overrides `pretty` when set.
    pub serializer: Option<Arc<dyn Serializer>>,
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("pretty", &self.pretty)
            .field("load_in_background", &self.load_in_background)
            .field("custom_serializer", &self.serializer.is_some())
            .finish()
    }
}

/// Configures and opens a [`Store`].
///
/// ```rust,no_run
/// use json_prefs::Store;
///
/// let store = Store::builder("settings.json")
///     .pretty(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct StoreBuilder {
    path: PathBuf,
    options: StoreOptions,
}

impl StoreBuilder {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: StoreOptions::default(),
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Write human-readable JSON with indentation (default: compact).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.options.pretty = yes;
        self
    }

    /// Load on a background thread. Reads and edits fail with
    /// [`Error::NotLoaded`] until [`Store::wait_loaded`] returns.
    pub fn load_in_background(mut self, yes: bool) -> Self {
        self.options.load_in_background = yes;
        self
    }

    /// Use a custom on-disk format.
    pub fn serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.options.serializer = Some(Arc::new(serializer));
        self
    }

    /// Create the store and start (or finish) loading it. The result is not
    /// shared with any other store on the same path.
    ///
    /// A load failure is not reported here; it surfaces as
    /// [`Error::LoadFailed`] from every read and edit.
    pub fn build(self) -> Result<Store> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".into()));
        }

        let serializer = match self.options.serializer {
            Some(s) => s,
            None if self.options.pretty => Arc::new(JsonSerializer::pretty()),
            None => Arc::new(JsonSerializer::new()),
        };

        let label = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let queue = WriteQueue::start(&label)?;

        let shared = Arc::new(Shared {
            path: self.path,
            serializer,
            state: Mutex::new(State {
                load: LoadState::Pending,
                map: Arc::new(PrefMap::new()),
                memory_generation: 0,
                pending_writes: 0,
            }),
            loaded: Condvar::new(),
            disk_generation: Mutex::new(0),
            notifier: ChangeNotifier::new(),
            emitting: Mutex::new(()),
        });

        if self.options.load_in_background {
            let loader = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("json-prefs-load:{label}"))
                .spawn(move || bootstrap(&loader))?;
        } else {
            bootstrap(&shared);
        }

        Ok(Store {
            shared,
            queue: Arc::new(queue),
        })
    }
}
