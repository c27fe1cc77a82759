use json_prefs::Store;
use std::thread;

fn main() -> Result<(), json_prefs::Error> {
    env_logger::init();
    let path = std::env::temp_dir().join("json_prefs_example_listener.json");
    let store = Store::open(&path)?;

    let changes = store.changes();
    let listener = thread::spawn(move || {
        // ends once every handle to the store is dropped
        for key in changes {
            println!("changed: {key}");
        }
    });

    store.edit()?.put("a", 1).put("b", 2).commit();
    store.edit()?.put("a", 1).commit(); // same value, nothing reported
    store.edit()?.remove("b").apply();
    store.wait_for_pending_writes();

    drop(store);
    let _ = listener.join();
    let _ = std::fs::remove_file(&path);
    Ok(())
}
