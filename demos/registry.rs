use json_prefs::{Registry, StoreOptions};

fn main() -> Result<(), json_prefs::Error> {
    env_logger::init();
    let path = std::env::temp_dir().join("json_prefs_example_registry.json");

    let registry = Registry::with_options(StoreOptions {
        pretty: true,
        ..StoreOptions::default()
    });

    // two parts of the application ask for the same file
    let ui = registry.open(&path)?;
    let audio = registry.open(&path)?;

    ui.edit()?.put("theme", "dark").apply();
    audio.edit()?.put("volume", 7).apply();

    // both see both changes: there is only one store behind the handles
    println!("ui sees volume    = {}", ui.get_int("volume", 0)?);
    println!("audio sees theme  = {}", audio.get_string("theme", "light")?);
    println!("open stores       = {}", registry.len());

    ui.wait_for_pending_writes();
    println!("{:?}", ui.all()?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
