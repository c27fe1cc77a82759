use json_prefs::Store;

fn main() -> Result<(), json_prefs::Error> {
    env_logger::init();
    let path = std::env::temp_dir().join("json_prefs_example_basic.json");
    let store = Store::builder(&path).pretty(true).build()?;

    // stage a batch and wait for it to hit the disk
    let ok = store
        .edit()?
        .put("apples", 3)
        .put("ratio", 0.75)
        .put("fruit", vec!["apple", "banana"])
        .commit();
    println!("commit ok = {ok}");

    // typed reads fall back to the default for missing keys
    println!("apples  = {}", store.get_int("apples", 0)?);
    println!("lemons  = {}", store.get_int("lemons", 0)?);
    println!("ratio   = {}", store.get_float("ratio", 0.0)?);

    // reading with the wrong type is an error, not a silent conversion
    if let Err(e) = store.get_bool("apples", false) {
        println!("expected error: {e}");
    }

    // apply returns immediately; the write happens in the background
    store.edit()?.put("apples", 4).remove("ratio").apply();
    println!("apples after apply = {}", store.get_int("apples", 0)?);
    store.wait_for_pending_writes();

    println!(
        "generation: memory {} / disk {}",
        store.memory_generation(),
        store.disk_generation()
    );
    println!("on disk:\n{}", std::fs::read_to_string(store.path())?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
