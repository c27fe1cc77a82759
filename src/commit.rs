//! Commit snapshots and their write completion signal.

use crate::value::PrefMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// How a physical write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes actually hit the disk for this commit.
    pub written: bool,
    /// The commit's state is durable, either by this write or an earlier/later one.
    pub success: bool,
}

impl WriteOutcome {
    /// Nothing to do: the state was already on disk or superseded.
    pub const SKIPPED: WriteOutcome = WriteOutcome {
        written: false,
        success: true,
    };
    /// The snapshot was written and synced.
    pub const WRITTEN: WriteOutcome = WriteOutcome {
        written: true,
        success: true,
    };
    /// The write failed; the previous state is still recoverable.
    pub const FAILED: WriteOutcome = WriteOutcome {
        written: false,
        success: false,
    };
}

/// One committed generation, produced by an [`Editor`](crate::Editor) and
/// handed to the store's writer.
///
/// Immutable apart from its completion signal, which fires exactly once.
#[derive(Debug)]
pub struct CommitResult {
    generation: u64,
    modified_keys: Vec<String>,
    snapshot: Arc<PrefMap>,
    outcome: Mutex<Option<WriteOutcome>>,
    done: Condvar,
}

impl CommitResult {
    pub(crate) fn new(generation: u64, modified_keys: Vec<String>, snapshot: Arc<PrefMap>) -> Self {
        Self {
            generation,
            modified_keys,
            snapshot,
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Memory generation this snapshot represents.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Keys changed by the commit, in the order they were changed. Empty when
    /// nobody was listening for changes.
    #[must_use]
    pub fn modified_keys(&self) -> &[String] {
        &self.modified_keys
    }

    /// The map to persist.
    #[must_use]
    pub fn snapshot(&self) -> &PrefMap {
        &self.snapshot
    }

    /// Outcome if the write already finished.
    #[must_use]
    pub fn outcome(&self) -> Option<WriteOutcome> {
        *self.outcome.lock()
    }

    /// Block until the write finishes. There is no timeout.
    pub fn wait(&self) -> WriteOutcome {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(o) = *outcome {
                return o;
            }
            self.done.wait(&mut outcome);
        }
    }

    /// Fire the completion signal. Later calls are ignored.
    pub(crate) fn complete(&self, result: WriteOutcome) {
        let mut outcome = self.outcome.lock();
        if outcome.is_some() {
            log::warn!(
                "generation {} completed twice, keeping first outcome",
                self.generation
            );
            return;
        }
        *outcome = Some(result);
        self.done.notify_all();
    }
}
