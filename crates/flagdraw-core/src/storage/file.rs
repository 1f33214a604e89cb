//! File-based storage implementation.

use super::{StorageError, StorageResult, TableStore, Tables};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Name of the data file inside the storage directory.
pub const DATA_FILE: &str = "flagdraw.json";

/// File-based storage.
///
/// Keeps all tables in memory and rewrites a single JSON file in the base
/// directory after every successful mutation.
#[derive(Debug)]
pub struct FileStorage {
    base_path: PathBuf,
    tables: RwLock<Tables>,
}

impl FileStorage {
    /// Open storage in `base_path`, creating the directory if needed and
    /// loading an existing data file.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let path = base_path.join(DATA_FILE);
        let tables = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            Tables::default()
        };
        log::info!("Opened flag storage at {}", path.display());

        Ok(Self {
            base_path,
            tables: RwLock::new(tables),
        })
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn data_path(&self) -> PathBuf {
        self.base_path.join(DATA_FILE)
    }

    /// Write through a temporary file so a crash never leaves a torn file.
    fn persist(&self, tables: &Tables) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(tables)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let path = self.data_path();
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })
    }
}

impl TableStore for FileStorage {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StorageResult<T> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(f(&*tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StorageResult<T>) -> StorageResult<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;

        let mut next = tables.clone();
        let result = f(&mut next)?;
        self.persist(&next)?;
        *tables = next;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::block_on;
    use crate::storage::{FlagPatch, NewFlag, NewUser, Storage};
    use tempfile::tempdir;

    const IMAGE: &str = "data:image/png;base64,AAA";

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            password_hash: String::new(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
        }
    }

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let user = block_on(storage.create_user(alice())).unwrap();

        let created = block_on(storage.create_flag(user.id, NewFlag::new("Test", IMAGE))).unwrap();
        let loaded = block_on(storage.get_flag(created.id, user.id)).unwrap();

        assert_eq!(loaded, Some(created));
        assert!(dir.path().join(DATA_FILE).exists());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        let (user, flag) = {
            let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
            let user = block_on(storage.create_user(alice())).unwrap();
            let flag = block_on(storage.create_flag(user.id, NewFlag::new("Test", IMAGE))).unwrap();
            let flag = block_on(storage.update_flag(flag.id, user.id, FlagPatch::name("Renamed")))
                .unwrap()
                .unwrap();
            (user, flag)
        };

        let reopened = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            block_on(reopened.list_flags(user.id)).unwrap(),
            vec![flag.clone()]
        );

        // Id counters survive too.
        let next = block_on(reopened.create_flag(user.id, NewFlag::new("Next", IMAGE))).unwrap();
        assert!(next.id > flag.id);
    }

    #[test]
    fn test_failed_write_changes_nothing() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        block_on(storage.create_user(alice())).unwrap();

        let result = block_on(storage.create_user(alice()));
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let reopened = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(block_on(reopened.user_by_username("alice")).unwrap().is_some());
    }

    #[test]
    fn test_failed_persist_keeps_previous_state() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let user = block_on(storage.create_user(alice())).unwrap();
        let flag = block_on(storage.create_flag(user.id, NewFlag::new("Test", IMAGE))).unwrap();
        let on_disk = fs::read_to_string(dir.path().join(DATA_FILE)).unwrap();

        // A directory in the way of the temporary file makes every write fail.
        fs::create_dir(dir.path().join("flagdraw.json.tmp")).unwrap();

        let created = block_on(storage.create_flag(user.id, NewFlag::new("Lost", IMAGE)));
        assert!(matches!(created, Err(StorageError::Io(_))));
        let renamed = block_on(storage.update_flag(flag.id, user.id, FlagPatch::name("Lost")));
        assert!(matches!(renamed, Err(StorageError::Io(_))));
        let deleted = block_on(storage.delete_flag(flag.id, user.id));
        assert!(matches!(deleted, Err(StorageError::Io(_))));

        assert_eq!(
            block_on(storage.list_flags(user.id)).unwrap(),
            vec![flag.clone()]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(DATA_FILE)).unwrap(),
            on_disk
        );

        // Writes succeed again once the path is clear, and ids were not consumed.
        fs::remove_dir(dir.path().join("flagdraw.json.tmp")).unwrap();
        let next = block_on(storage.create_flag(user.id, NewFlag::new("Next", IMAGE))).unwrap();
        assert_eq!(next.id, flag.id + 1);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DATA_FILE), "{ not json").unwrap();

        let result = FileStorage::new(dir.path().to_path_buf());
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(nested.clone()).unwrap();
        assert_eq!(storage.base_path(), nested.as_path());
    }
}
