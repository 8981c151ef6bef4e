//! Backing store trait and implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Synchronous string-keyed key-value surface the expiring cache is built on.
///
/// Implementations must provide atomic single-key reads and writes; the cache
/// layer does no locking of its own. Failures propagate to the caller as-is,
/// the cache performs no retries.
pub trait BackingStore: Send + Sync {
  /// Read the raw value stored under `key`, `None` when absent.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Write the raw value for `key`, overwriting any prior value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove the value for `key`. Removing an absent key is not an error.
  fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile in-memory store.
///
/// Clones share the same underlying map, so tests can keep a handle to
/// inspect or corrupt entries behind the cache's back. Also serves
/// `--no-cache` runs, where a fresh map per run means every row refetches.
#[derive(Clone, Default)]
pub struct MemoryStore {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl BackingStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }
}

/// SQLite-based persistent store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open a store backed by an in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.init_schema()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("roadview").join("cache.db"))
  }

  fn init_schema(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to create cache schema: {}", e))?;

    Ok(())
  }
}

/// Schema for the cache table. One row per identifier; the value column holds
/// the serialized entry as an opaque string.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

impl BackingStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row("SELECT value FROM cache WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write cache entry: {}", e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM cache WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache entry: {}", e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_store_round_trips() {
    let store = MemoryStore::new();

    assert_eq!(store.get("a").unwrap(), None);
    store.set("a", "one").unwrap();
    assert_eq!(store.get("a").unwrap(), Some("one".to_string()));

    store.set("a", "two").unwrap();
    assert_eq!(store.get("a").unwrap(), Some("two".to_string()));

    store.remove("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
  }

  #[test]
  fn memory_store_clones_share_entries() {
    let store = MemoryStore::new();
    let handle = store.clone();

    store.set("a", "one").unwrap();
    assert_eq!(handle.get("a").unwrap(), Some("one".to_string()));
  }

  #[test]
  fn sqlite_store_round_trips() {
    let store = SqliteStore::open_in_memory().unwrap();

    assert_eq!(store.get("a").unwrap(), None);
    store.set("a", "one").unwrap();
    assert_eq!(store.get("a").unwrap(), Some("one".to_string()));

    store.set("a", "two").unwrap();
    assert_eq!(store.get("a").unwrap(), Some("two".to_string()));

    store.remove("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
  }

  #[test]
  fn sqlite_store_removing_absent_key_is_ok() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.remove("missing").unwrap();
  }
}
