//! Batched edits and the commit-to-memory protocol.

use crate::commit::{CommitResult, WriteOutcome};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::value::Value;
use std::sync::Arc;
use std::time::Instant;

/// One staged change to a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Store this value.
    Set(Value),
    /// Delete the key.
    Remove,
}

/// A batch of pending changes against one [`Store`].
///
/// Nothing touches the store until [`commit`](Self::commit) or
/// [`apply`](Self::apply). Staging methods chain:
///
/// ```rust,no_run
/// # use json_prefs::Store;
/// # let store = Store::open("settings.json").unwrap();
/// let ok = store
///     .edit()
///     .unwrap()
///     .put("theme", "dark")
///     .put("font_size", 14)
///     .remove("legacy_flag")
///     .commit();
/// ```
///
/// An editor can be reused after a terminal call; each terminal call only
/// carries what was staged since the previous one.
#[derive(Debug)]
pub struct Editor<'a> {
    store: &'a Store,
    staged: Vec<(String, Mutation)>,
    clear_all: bool,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            staged: Vec::new(),
            clear_all: false,
        }
    }

    /// Stage `key = value`.
    ///
    /// NaN and infinite floats cannot be persisted. Staging one makes the next
    /// [`commit`](Self::commit) or [`apply`](Self::apply) discard the whole
    /// batch without touching the store.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.stage(key.into(), Mutation::Set(value.into()))
    }

    /// Stage `key = value`, or a removal of `key` when `value` is `None`.
    pub fn put_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.put(key, v),
            None => self.remove(key),
        }
    }

    /// Stage the removal of `key`.
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.stage(key.into(), Mutation::Remove)
    }

    /// Stage removal of every entry. Applied before the other staged changes
    /// no matter when it was called.
    pub fn clear(&mut self) -> &mut Self {
        self.clear_all = true;
        self
    }

    /// Staged changes in the order they will be applied.
    #[must_use]
    pub fn staged(&self) -> &[(String, Mutation)] {
        &self.staged
    }

    // Restaging a key replaces its earlier mutation and moves it to the back.
    fn stage(&mut self, key: String, mutation: Mutation) -> &mut Self {
        self.staged.retain(|(k, _)| *k != key);
        self.staged.push((key, mutation));
        self
    }

    /// Apply the changes in memory and write them in the background.
    ///
    /// Every reader sees the new values as soon as this returns. The write
    /// outcome is never reported back; failures are only logged.
    pub fn apply(&mut self) {
        let started = Instant::now();
        let result = match self.commit_to_memory() {
            Ok(r) => r,
            Err(e) => {
                log::error!("apply on {} dropped: {e}", self.store.path().display());
                return;
            }
        };

        let generation = result.generation();
        let path = self.store.path().to_path_buf();
        self.store.enqueue_write(
            result,
            Some(Box::new(move |outcome: WriteOutcome| {
                if outcome.success {
                    log::trace!(
                        "apply of generation {generation} settled in {:?} (written: {})",
                        started.elapsed(),
                        outcome.written
                    );
                } else {
                    log::warn!(
                        "background write of generation {generation} to {} failed",
                        path.display()
                    );
                }
            })),
        );
    }

    /// Apply the changes in memory, write them, and wait for the write.
    ///
    /// Returns `true` once this commit's state is on disk (written by this
    /// call or already covered by another write), `false` if the write failed
    /// or the batch was refused (store unusable, or a non-finite float was
    /// staged). Blocks indefinitely if the write never
    /// finishes.
    pub fn commit(&mut self) -> bool {
        let result = match self.commit_to_memory() {
            Ok(r) => r,
            Err(e) => {
                log::error!("commit on {} refused: {e}", self.store.path().display());
                return false;
            }
        };
        self.store.enqueue_write(Arc::clone(&result), None);
        result.wait().success
    }

    // Applies the batch, bumps the generation and emits the changed keys.
    fn commit_to_memory(&mut self) -> Result<Arc<CommitResult>> {
        self.reject_unstorable()?;
        let store = self.store;
        let shared = &store.shared;
        let track = shared.notifier.has_subscribers();
        let mut guard = shared.state.lock();
        guard.check_loaded()?;
        let state = &mut *guard;

        // Forks the map only while a queued write still holds the current one.
        let map = Arc::make_mut(&mut state.map);
        state.pending_writes += 1;

        let mut changed = false;
        let mut modified = Vec::new();
        if std::mem::take(&mut self.clear_all) && !map.is_empty() {
            map.clear();
            changed = true;
        }
        for (key, mutation) in self.staged.drain(..) {
            match mutation {
                Mutation::Remove => {
                    if map.remove(&key).is_none() {
                        continue;
                    }
                }
                Mutation::Set(value) => {
                    if map.get(&key) == Some(&value) {
                        continue;
                    }
                    map.insert(key.clone(), value);
                }
            }
            changed = true;
            if track {
                modified.push(key);
            }
        }

        if changed {
            state.memory_generation += 1;
        }
        let result = Arc::new(CommitResult::new(
            state.memory_generation,
            modified,
            Arc::clone(&state.map),
        ));

        // Taken before the state lock is released: listeners see commits in
        // generation order.
        let _emitting = shared.emitting.lock();
        drop(guard);
        shared.notifier.emit(result.modified_keys());
        Ok(result)
    }

    fn reject_unstorable(&mut self) -> Result<()> {
        let bad = self.staged.iter().find_map(|(key, mutation)| match mutation {
            Mutation::Set(value) if !value.is_storable() => Some(Error::InvalidValue {
                key: key.clone(),
                value: format!("{value:?}"),
            }),
            _ => None,
        });
        match bad {
            Some(err) => {
                self.staged.clear();
                self.clear_all = false;
                Err(err)
            }
            None => Ok(()),
        }
    }
}
