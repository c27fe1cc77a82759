//! Crash-safe JSON preference store.
//!
//! A [`Store`] is an in-memory map of string keys to a handful of value kinds,
//! backed by one JSON file. Changes are batched in an [`Editor`] and either
//! committed (wait for the disk write) or applied (write in the background).
//! Writes never overwrite a newer state with an older one, and a crash during
//! a write leaves a `.bak` file that the next load restores.
//!
//! Open stores through a [`Registry`], which hands out one shared [`Store`]
//! per path. [`Store::open`] and [`Store::builder`] create unmanaged instances
//! for callers that own their file outright.
//!
//! ```rust,no_run
//! use json_prefs::Registry;
//!
//! let registry = Registry::new();
//! let prefs = registry.open("settings.json").unwrap();
//! prefs.edit().unwrap().put("theme", "dark").apply();
//! assert_eq!(prefs.get_string("theme", "light").unwrap(), "dark");
//! ```
//!
//! **Single-process only.** If multiple processes open the same file they will
//! clobber each other. Use advisory file locking or a real database for
//! multi-process access.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod commit;
pub mod editor;
pub mod error;
pub mod notify;
pub mod persist;
pub mod registry;
pub mod serializer;
pub mod store;
pub mod value;
mod writer;

pub use commit::{CommitResult, WriteOutcome};
pub use editor::{Editor, Mutation};
pub use error::{Error, Result};
pub use notify::{ChangeNotifier, ChangeStream};
pub use registry::Registry;
pub use serializer::{JsonSerializer, Serializer};
pub use store::{Store, StoreBuilder, StoreOptions};
pub use value::{PrefMap, PrefValue, Value, ValueKind};
