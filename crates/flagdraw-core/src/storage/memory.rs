//! In-memory storage implementation.

use super::{StorageError, StorageResult, TableStore, Tables};
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStorage {
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
        f(&mut *tables)
    }
}
