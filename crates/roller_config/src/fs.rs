//! Filesystem helpers for config directories.

use crate::ConfigError;
use std::path::Path;

/// True if `dir` exists and has at least one entry.
pub fn dir_not_empty(dir: &Path) -> Result<bool, ConfigError> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ConfigError::io(dir, e)),
    }
}

/// Delete `dir` and everything under it. A missing directory is not an error.
pub fn remove_dir_all(dir: &Path) -> Result<(), ConfigError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::io(dir, e)),
    }
}

pub fn create_dir_all(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))
}

/// Move a file, creating the destination's parent directories.
pub fn move_file(from: &Path, to: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    std::fs::copy(from, to).map_err(|e| ConfigError::io(from, e))?;
    std::fs::remove_file(from).map_err(|e| ConfigError::io(from, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(!dir_not_empty(&missing).unwrap());

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(!dir_not_empty(&empty).unwrap());

        std::fs::write(empty.join("key"), "x").unwrap();
        assert!(dir_not_empty(&empty).unwrap());
    }

    #[test]
    fn test_move_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("avail.toml");
        let to = dir.path().join("da-light-node").join("avail.toml");
        std::fs::write(&from, "seed = \"x\"").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "seed = \"x\"");
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir_all(&dir.path().join("nope")).unwrap();
    }
}
