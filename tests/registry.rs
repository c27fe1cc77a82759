mod common;

use common::{cleanup, fresh_path, read_disk, GatedSerializer};
use json_prefs::{Error, Registry, Store, StoreOptions, Value};
use std::sync::Arc;

#[test]
fn same_path_shares_one_store() {
    let path = fresh_path("registry_shared");
    let registry = Registry::new();
    let a = registry.open(&path).unwrap();
    let b = registry.open(&path).unwrap();

    a.edit().unwrap().put("k", "from a").apply();
    assert_eq!(b.get_string("k", "").unwrap(), "from a");
    assert_eq!(registry.len(), 1);
    a.wait_for_pending_writes();
    cleanup(&path);
}

#[test]
fn commits_through_two_handles_both_reach_disk() {
    let path = fresh_path("registry_two_handles");
    let registry = Registry::new();
    let a = registry.open(&path).unwrap();
    let b = registry.open(&path).unwrap();

    assert!(a.edit().unwrap().put("x", 1).commit());
    assert!(b.edit().unwrap().put("y", 2).commit());
    assert_eq!(a.get_int("y", 0).unwrap(), 2);
    let disk = read_disk(&path);
    assert_eq!(disk.get("x"), Some(&Value::Int(1)));
    assert_eq!(disk.get("y"), Some(&Value::Int(2)));
    cleanup(&path);
}

#[test]
fn unmanaged_stores_are_separate_instances() {
    let path = fresh_path("registry_unmanaged");
    let registry = Registry::new();
    let managed = registry.open(&path).unwrap();
    let unmanaged = Store::open(&path).unwrap();

    assert!(managed.edit().unwrap().put("x", 1).commit());
    assert!(!unmanaged.contains("x").unwrap());
    assert_eq!(unmanaged.memory_generation(), 0);
    assert!(registry.get(&path).is_some());
    cleanup(&path);
}

#[test]
fn different_paths_are_independent() {
    let p1 = fresh_path("registry_one");
    let p2 = fresh_path("registry_two");
    let registry = Registry::new();
    let one = registry.open(&p1).unwrap();
    let two = registry.open(&p2).unwrap();

    assert!(one.edit().unwrap().put("k", 1).commit());
    assert!(!two.contains("k").unwrap());
    assert_eq!(two.memory_generation(), 0);
    assert_eq!(registry.len(), 2);
    cleanup(&p1);
    cleanup(&p2);
}

#[test]
fn get_only_returns_open_stores() {
    let path = fresh_path("registry_get");
    let registry = Registry::new();
    assert!(registry.is_empty());
    assert!(registry.get(&path).is_none());
    registry.open(&path).unwrap();
    assert!(registry.get(&path).is_some());
    cleanup(&path);
}

#[test]
fn close_then_open_reloads_from_disk() {
    let path = fresh_path("registry_close");
    let registry = Registry::new();
    let first = registry.open(&path).unwrap();
    assert!(first.edit().unwrap().put("k", 1).commit());

    assert!(registry.close(&path));
    assert!(!registry.close(&path));

    let second = registry.open(&path).unwrap();
    assert_eq!(second.get_int("k", 0).unwrap(), 1);
    // a fresh store starts counting again
    assert_eq!(second.memory_generation(), 0);
    cleanup(&path);
}

#[test]
fn open_waits_for_load_by_default() {
    let path = fresh_path("registry_wait");
    std::fs::write(&path, br#"{"k":"v"}"#).unwrap();
    let registry = Registry::new();
    let store = registry.open(&path).unwrap();
    assert_eq!(store.get_string("k", "").unwrap(), "v");
    cleanup(&path);
}

#[test]
fn background_option_returns_before_load() {
    let path = fresh_path("registry_background");
    std::fs::write(&path, br#"{"k":"v"}"#).unwrap();

    let gate = GatedSerializer::default();
    let registry = Registry::with_options(StoreOptions {
        load_in_background: true,
        serializer: Some(Arc::new(gate.clone())),
        ..StoreOptions::default()
    });
    let store = registry.open(&path).unwrap();
    assert_eq!(store.get_value("k").unwrap_err(), Error::NotLoaded);

    gate.open();
    store.wait_loaded().unwrap();
    assert_eq!(store.get_string("k", "").unwrap(), "v");
    cleanup(&path);
}
