//! Disk I/O: load with backup recovery, and the backup-swap write.
//!
//! The primary file is never overwritten in place while it is the only good
//! copy. Before a write touches it, the primary is renamed to `<primary>.bak`;
//! the backup is only deleted once the new primary has been fully written and
//! synced. A backup found at load time therefore means the last write was
//! interrupted, and the backup is restored.
//!
//! Single-process only: two processes writing the same file can still clobber
//! each other.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use crate::value::PrefMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Backup location for `path`: the full file name with `.bak` appended.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Restore `<path>.bak` over `path` if a backup exists. Returns `true` when a
/// backup was restored.
pub fn recover_from_backup(path: &Path) -> Result<bool> {
    let backup = backup_path(path);
    if !backup.exists() {
        return Ok(false);
    }
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(&backup, path)?;
    log::debug!("restored {} from backup", path.display());
    Ok(true)
}

/// Recover from an interrupted write, then read and decode the file at `path`.
///
/// Missing or empty files load as an empty map. A file that cannot be decoded
/// also loads as an empty map (with a warning): a corrupt preferences file
/// should not keep the application from starting with defaults. Only I/O
/// failures are errors.
pub fn load(path: &Path, serializer: &dyn Serializer) -> Result<PrefMap> {
    recover_from_backup(path)?;
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PrefMap::new()),
        Err(e) => return Err(Error::Io(e.to_string())),
    };
    if bytes.is_empty() {
        return Ok(PrefMap::new());
    }
    match serializer.decode(&bytes) {
        Ok(map) => Ok(map),
        Err(e) => {
            log::warn!("ignoring unreadable {}: {e}", path.display());
            Ok(PrefMap::new())
        }
    }
}

/// Persist `map` to `path` behind a backup.
///
/// On error the on-disk state is still recoverable: either the old primary was
/// never touched, or the backup holds it and the partial primary is removed.
pub fn write_with_backup(path: &Path, map: &PrefMap, serializer: &dyn Serializer) -> Result<()> {
    let backup = backup_path(path);
    if path.exists() {
        if backup.exists() {
            // an earlier interrupted write already left the recovery point
            fs::remove_file(path)?;
        } else {
            fs::rename(path, &backup)?;
        }
    }

    if let Err(e) = write_primary(path, map, serializer) {
        if path.exists() {
            if let Err(rm) = fs::remove_file(path) {
                log::warn!("could not remove partial {}: {rm}", path.display());
            }
        }
        return Err(e);
    }

    // A stale backup would shadow the new primary on the next load.
    if backup.exists() {
        fs::remove_file(&backup).map_err(|e| {
            Error::WriteFailed(format!(
                "wrote {} but could not remove stale backup: {e}",
                path.display()
            ))
        })?;
    }
    Ok(())
}

fn write_primary(path: &Path, map: &PrefMap, serializer: &dyn Serializer) -> Result<()> {
    let mut file = fs::File::create(path)?;
    let bytes = serializer.encode(map)?;
    file.write_all(&bytes)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::JsonSerializer;
    use crate::value::Value;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("json_prefs_persist_{}.json", name))
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        let _ = fs::remove_file(backup_path(path));
    }

    fn one(key: &str, value: i64) -> PrefMap {
        let mut m = PrefMap::new();
        m.insert(key.into(), Value::Int(value));
        m
    }

    #[test]
    fn backup_name_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/tmp/prefs.json")),
            PathBuf::from("/tmp/prefs.json.bak")
        );
    }

    #[test]
    fn write_then_load() {
        let path = temp_path("write_load");
        cleanup(&path);
        let ser = JsonSerializer::new();
        write_with_backup(&path, &one("a", 1), &ser).unwrap();
        assert!(!backup_path(&path).exists());
        assert_eq!(load(&path, &ser).unwrap(), one("a", 1));
        cleanup(&path);
    }

    #[test]
    fn load_prefers_backup() {
        let path = temp_path("prefer_backup");
        cleanup(&path);
        fs::write(&path, b"{\"a\":").unwrap();
        fs::write(backup_path(&path), b"{\"a\":2}").unwrap();
        assert_eq!(load(&path, &JsonSerializer::new()).unwrap(), one("a", 2));
        assert!(!backup_path(&path).exists());
        cleanup(&path);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = temp_path("corrupt");
        cleanup(&path);
        fs::write(&path, b"not json at all").unwrap();
        assert!(load(&path, &JsonSerializer::new()).unwrap().is_empty());
        cleanup(&path);
    }

    #[test]
    fn failed_encode_keeps_previous_state_recoverable() {
        let path = temp_path("failed_encode");
        cleanup(&path);
        let ser = JsonSerializer::new();
        write_with_backup(&path, &one("a", 1), &ser).unwrap();

        let mut bad = PrefMap::new();
        bad.insert("a".into(), Value::Float(f64::NAN));
        assert!(write_with_backup(&path, &bad, &ser).is_err());

        assert!(!path.exists());
        assert!(backup_path(&path).exists());
        assert_eq!(load(&path, &ser).unwrap(), one("a", 1));
        cleanup(&path);
    }
}
