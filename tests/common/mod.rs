#![allow(dead_code)]

use json_prefs::persist::backup_path;
use json_prefs::{Error, JsonSerializer, PrefMap, Result, Serializer};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("json_prefs_test_{}.json", name))
}

/// Temp path with no leftovers from an earlier run.
pub fn fresh_path(name: &str) -> PathBuf {
    let path = temp_path(name);
    cleanup(&path);
    path
}

pub fn cleanup(path: &Path) {
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(backup_path(path));
}

pub fn read_disk(path: &Path) -> PrefMap {
    let bytes = std::fs::read(path).unwrap();
    JsonSerializer::new().decode(&bytes).unwrap()
}

/// JSON serializer that counts encodes and can be told to fail them.
#[derive(Clone, Default)]
pub struct TestSerializer {
    pub encodes: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl TestSerializer {
    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, yes: bool) {
        self.fail.store(yes, Ordering::SeqCst);
    }
}

impl Serializer for TestSerializer {
    fn encode(&self, data: &PrefMap) -> Result<Vec<u8>> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Serialize("injected failure".into()));
        }
        JsonSerializer::new().encode(data)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PrefMap> {
        JsonSerializer::new().decode(bytes)
    }
}

/// JSON serializer whose decode blocks until [`open`](Self::open) is called.
#[derive(Clone, Default)]
pub struct GatedSerializer {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl GatedSerializer {
    pub fn open(&self) {
        let (lock, cv) = &*self.gate;
        *lock.lock() = true;
        cv.notify_all();
    }
}

impl Serializer for GatedSerializer {
    fn encode(&self, data: &PrefMap) -> Result<Vec<u8>> {
        JsonSerializer::new().encode(data)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PrefMap> {
        let (lock, cv) = &*self.gate;
        let mut open = lock.lock();
        while !*open {
            cv.wait(&mut open);
        }
        JsonSerializer::new().decode(bytes)
    }
}

/// JSON serializer that counts encodes and holds the first one until
/// [`release`](Self::release) is called.
#[derive(Clone, Default)]
pub struct HeldSerializer {
    encodes: Arc<AtomicUsize>,
    released: Arc<(Mutex<bool>, Condvar)>,
}

impl HeldSerializer {
    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    /// Spin until the first encode has started.
    pub fn wait_held(&self) {
        while self.encodes() == 0 {
            std::thread::yield_now();
        }
    }

    pub fn release(&self) {
        let (lock, cv) = &*self.released;
        *lock.lock() = true;
        cv.notify_all();
    }
}

impl Serializer for HeldSerializer {
    fn encode(&self, data: &PrefMap) -> Result<Vec<u8>> {
        if self.encodes.fetch_add(1, Ordering::SeqCst) == 0 {
            let (lock, cv) = &*self.released;
            let mut released = lock.lock();
            while !*released {
                cv.wait(&mut released);
            }
        }
        JsonSerializer::new().encode(data)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PrefMap> {
        JsonSerializer::new().decode(bytes)
    }
}
