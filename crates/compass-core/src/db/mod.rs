// ============================================================================
// ProfileDb - Embedded Database (redb)
// ============================================================================
// Durable local storage for profile records, one JSON blob per key.
// Default path: ~/.compass/memory.redb (override via COMPASS_DB_PATH env var)
// ============================================================================

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{MemoryError, MemoryResult};

// Table definitions
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Environment variable overriding the default database location
pub const DB_PATH_ENV: &str = "COMPASS_DB_PATH";

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub path: PathBuf,
    pub records: usize,
    pub total_bytes: usize,
}

/// Embedded database holding persisted profile records
pub struct ProfileDb {
    db: Database,
    path: PathBuf,
}

impl ProfileDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses COMPASS_DB_PATH env var or ~/.compass/memory.redb
    pub fn open(path: Option<&Path>) -> MemoryResult<Self> {
        let db_path = if let Some(p) = path {
            p.to_path_buf()
        } else if let Ok(env_path) = std::env::var(DB_PATH_ENV) {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir()
                .ok_or_else(|| MemoryError::Storage("Cannot determine home directory".into()))?;
            home.join(".compass").join("memory.redb")
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MemoryError::storage("Failed to create database directory", e))?;
            }
        }

        info!("Opening profile database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| MemoryError::storage("Failed to open database", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| MemoryError::storage("Failed to begin write", e))?;
        {
            let _ = write_txn
                .open_table(PROFILES)
                .map_err(|e| MemoryError::storage("Failed to create profiles table", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::storage("Failed to commit init", e))?;

        debug!("Profile database ready");

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw bytes stored under `key`
    pub fn get(&self, key: &str) -> MemoryResult<Option<Vec<u8>>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MemoryError::storage("Failed to begin read", e))?;
        let table = read_txn
            .open_table(PROFILES)
            .map_err(|e| MemoryError::storage("Failed to open profiles table", e))?;

        let value = table
            .get(key)
            .map_err(|e| MemoryError::storage("Failed to get record", e))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Overwrite the bytes stored under `key`
    pub fn put(&self, key: &str, value: &[u8]) -> MemoryResult<()> {
        self.update(key, |_| Ok(value.to_vec()))
    }

    /// Read-modify-write `key` inside a single write transaction.
    ///
    /// `merge` receives the current bytes (if any) and returns the bytes to
    /// store. Nothing is written if it fails.
    pub fn update<F>(&self, key: &str, merge: F) -> MemoryResult<()>
    where
        F: FnOnce(Option<&[u8]>) -> MemoryResult<Vec<u8>>,
    {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MemoryError::storage("Failed to begin write", e))?;
        {
            let mut table = write_txn
                .open_table(PROFILES)
                .map_err(|e| MemoryError::storage("Failed to open profiles table", e))?;

            let current = table
                .get(key)
                .map_err(|e| MemoryError::storage("Failed to get record", e))?
                .map(|guard| guard.value().to_vec());

            let next = merge(current.as_deref())?;

            table
                .insert(key, next.as_slice())
                .map_err(|e| MemoryError::storage("Failed to insert record", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::storage("Failed to commit", e))?;

        debug!("Stored record: {}", key);
        Ok(())
    }

    /// Delete `key`. Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> MemoryResult<bool> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MemoryError::storage("Failed to begin write", e))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(PROFILES)
                .map_err(|e| MemoryError::storage("Failed to open profiles table", e))?;
            removed = table
                .remove(key)
                .map_err(|e| MemoryError::storage("Failed to remove record", e))?
                .is_some();
        }
        write_txn
            .commit()
            .map_err(|e| MemoryError::storage("Failed to commit delete", e))?;

        if removed {
            debug!("Deleted record: {}", key);
        }
        Ok(removed)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> MemoryResult<DbStats> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MemoryError::storage("Failed to begin read", e))?;
        let table = read_txn
            .open_table(PROFILES)
            .map_err(|e| MemoryError::storage("Failed to open profiles table", e))?;

        let mut records = 0;
        let mut total_bytes = 0;
        let iter = table
            .iter()
            .map_err(|e| MemoryError::storage("Failed to iterate records", e))?;
        for entry in iter {
            let (_key, value) = entry.map_err(|e| MemoryError::storage("Failed to read entry", e))?;
            records += 1;
            total_bytes += value.value().len();
        }

        Ok(DbStats {
            path: self.path.clone(),
            records,
            total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, ProfileDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = ProfileDb::open(Some(&dir.path().join("memory.redb"))).unwrap();
        (dir, db)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, db) = temp_db();

        assert!(db.get("profile:default").unwrap().is_none());

        db.put("profile:default", b"{}").unwrap();
        assert_eq!(db.get("profile:default").unwrap().unwrap(), b"{}".to_vec());

        assert!(db.delete("profile:default").unwrap());
        assert!(!db.delete("profile:default").unwrap());
        assert!(db.get("profile:default").unwrap().is_none());
    }

    #[test]
    fn test_update_sees_current_value() {
        let (_dir, db) = temp_db();
        db.put("k", b"a").unwrap();

        db.update("k", |current| {
            let mut next = current.unwrap_or_default().to_vec();
            next.extend_from_slice(b"b");
            Ok(next)
        })
        .unwrap();

        assert_eq!(db.get("k").unwrap().unwrap(), b"ab".to_vec());
    }

    #[test]
    fn test_failed_merge_writes_nothing() {
        let (_dir, db) = temp_db();
        db.put("k", b"keep").unwrap();

        let result = db.update("k", |_| Err(MemoryError::Storage("boom".into())));
        assert!(result.is_err());
        assert_eq!(db.get("k").unwrap().unwrap(), b"keep".to_vec());
    }

    #[test]
    fn test_stats() {
        let (_dir, db) = temp_db();
        db.put("a", b"123").unwrap();
        db.put("b", b"45").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.total_bytes, 5);
        assert!(stats.path.ends_with("memory.redb"));
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.redb");
        {
            let db = ProfileDb::open(Some(&path)).unwrap();
            db.put("profile:default", b"persisted").unwrap();
        }
        let db = ProfileDb::open(Some(&path)).unwrap();
        assert_eq!(db.get("profile:default").unwrap().unwrap(), b"persisted".to_vec());
    }
}
