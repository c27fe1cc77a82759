//! One shared [`Store`] per file path.

use crate::error::Result;
use crate::store::{Store, StoreOptions};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Hands out one shared [`Store`] per path.
///
/// Create one at your application's composition root and pass it to whoever
/// needs preferences. Opening the same path twice returns handles to the same
/// store, so every caller sees the same map. Paths are compared as given, so
/// `a/b.json` and `./a/b.json` are two different stores.
#[derive(Debug, Default)]
pub struct Registry {
    options: StoreOptions,
    stores: Mutex<HashMap<PathBuf, Store>>,
}

impl Registry {
    /// Registry that opens stores with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that opens every store with `options`.
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            options,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The store at `path`, opening it on first request.
    ///
    /// Unless the registry's options ask for background loading, this waits
    /// for the load to finish. The lock is not held while waiting, so opening
    /// a slow file does not hold up other paths.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref();
        let store = {
            let mut stores = self.stores.lock();
            match stores.get(path) {
                Some(store) => store.clone(),
                None => {
                    let store = Store::builder(path)
                        .options(self.options.clone())
                        .load_in_background(true)
                        .build()?;
                    stores.insert(path.to_path_buf(), store.clone());
                    store
                }
            }
        };
        if !self.options.load_in_background {
            // A failed load is reported by every read and edit on the store.
            let _ = store.wait_loaded();
        }
        Ok(store)
    }

    /// The store at `path` if it is already open.
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Store> {
        self.stores.lock().get(path.as_ref()).cloned()
    }

    /// Forget the store at `path`. Existing handles keep working; the next
    /// [`open`](Self::open) loads the file afresh. Returns `false` if it was
    /// not open.
    pub fn close(&self, path: impl AsRef<Path>) -> bool {
        self.stores.lock().remove(path.as_ref()).is_some()
    }

    /// Number of open stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    /// `true` when no store is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
