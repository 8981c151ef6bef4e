//! Expiring key-value cache over a pluggable backing store.

use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::store::BackingStore;

/// Field injected into every stored object carrying the expiration instant
/// in milliseconds since the Unix epoch.
const EXPIRE_AT_FIELD: &str = "expire_at";

/// Time-bounded cache wrapping a [`BackingStore`].
///
/// Values are serialized as JSON objects with an injected `expire_at` stamp
/// and served only while that instant lies in the future. Absent, corrupt,
/// and expired entries all degrade to misses; only backing-store failures
/// surface as errors.
pub struct ExpiringCache<S> {
  store: Arc<S>,
  /// How long a written entry stays valid.
  ttl: Duration,
  /// When set, every read reports a miss regardless of the stored stamp.
  force_refresh: bool,
}

impl<S: BackingStore> ExpiringCache<S> {
  /// Create a cache with the default ten-minute TTL.
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      ttl: Duration::milliseconds(600_000),
      force_refresh: false,
    }
  }

  /// Set the time-to-live applied to newly written entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Treat every read as a miss, forcing a refetch on each access.
  ///
  /// Cache-busting aid for development and debugging; off by default.
  pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }

  /// Read the value stored under `key`.
  ///
  /// Returns `Ok(None)` when the entry is absent, malformed, expired, or
  /// force-refresh is active. An entry stamped exactly at the current instant
  /// counts as expired.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.store.get(key)? else {
      debug!(key, "cache miss");
      return Ok(None);
    };

    if self.force_refresh {
      debug!(key, "force refresh, ignoring stored entry");
      return Ok(None);
    }

    let mut doc: Value = match serde_json::from_str(&raw) {
      Ok(doc) => doc,
      Err(_) => {
        debug!(key, "stored entry is not valid JSON, treating as miss");
        return Ok(None);
      }
    };

    let expire_at = match doc.get(EXPIRE_AT_FIELD).and_then(Value::as_i64) {
      Some(stamp) => stamp,
      None => {
        debug!(key, "stored entry has no expiration stamp, treating as miss");
        return Ok(None);
      }
    };

    if !fresh_at(expire_at, now_millis()) {
      debug!(key, expire_at, "cache entry expired");
      return Ok(None);
    }

    if let Some(obj) = doc.as_object_mut() {
      obj.remove(EXPIRE_AT_FIELD);
    }

    match serde_json::from_value(doc) {
      Ok(value) => {
        debug!(key, "cache hit");
        Ok(Some(value))
      }
      Err(_) => {
        debug!(key, "stored entry has an unexpected shape, treating as miss");
        Ok(None)
      }
    }
  }

  /// Write `value` under `key` with a fresh expiration stamp, overwriting any
  /// prior entry.
  pub fn add<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    let mut doc =
      serde_json::to_value(value).map_err(|e| eyre!("Failed to serialize cache entry: {}", e))?;

    doc
      .as_object_mut()
      .ok_or_else(|| eyre!("Cache values must serialize to JSON objects"))?
      .insert(EXPIRE_AT_FIELD.to_string(), Value::from(self.expiration()));

    self.store.set(key, &doc.to_string())?;
    debug!(key, "stored cache entry");

    Ok(())
  }

  /// Write `value` under `key` only when no valid entry is present.
  ///
  /// The no-op on a valid entry keeps a slow remote response from stomping a
  /// fresher value written by a later lookup for the same key. Replacement
  /// removes the stale raw entry before writing, so an expired and a fresh
  /// entry never coexist under one key.
  pub fn replace_expired<T>(&self, key: &str, value: &T) -> Result<()>
  where
    T: Serialize + DeserializeOwned,
  {
    if self.get::<T>(key)?.is_some() {
      debug!(key, "entry still valid, keeping it");
      return Ok(());
    }

    self.store.remove(key)?;
    self.add(key, value)
  }

  /// Expiration stamp for an entry written now.
  fn expiration(&self) -> i64 {
    now_millis() + self.ttl.num_milliseconds()
  }
}

impl<S> Clone for ExpiringCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      ttl: self.ttl,
      force_refresh: self.force_refresh,
    }
  }
}

/// Strict expiry rule: an entry is fresh only while `expire_at` lies strictly
/// in the future. A stamp equal to `now` is already expired.
fn fresh_at(expire_at: i64, now: i64) -> bool {
  expire_at > now
}

fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::MemoryStore;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Sample {
    name: String,
    count: u32,
  }

  fn sample() -> Sample {
    Sample {
      name: "alpha".to_string(),
      count: 3,
    }
  }

  #[test]
  fn add_then_get_round_trips() {
    let cache = ExpiringCache::new(MemoryStore::new());

    cache.add("k", &sample()).unwrap();
    assert_eq!(cache.get::<Sample>("k").unwrap(), Some(sample()));
  }

  #[test]
  fn absent_key_is_a_miss() {
    let cache = ExpiringCache::new(MemoryStore::new());
    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn entry_past_its_expiration_is_a_miss() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone());

    store
      .set("k", r#"{"name":"alpha","count":3,"expire_at":1}"#)
      .unwrap();

    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn non_positive_ttl_expires_entries_immediately() {
    let cache = ExpiringCache::new(MemoryStore::new()).with_ttl(Duration::milliseconds(-1));

    cache.add("k", &sample()).unwrap();
    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn expiration_boundary_counts_as_expired() {
    assert!(!fresh_at(1_000, 1_000));
    assert!(!fresh_at(999, 1_000));
    assert!(fresh_at(1_001, 1_000));
  }

  #[test]
  fn malformed_entry_degrades_to_a_miss() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone());

    store.set("k", r#"{"name":"alpha","cou"#).unwrap();
    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn entry_without_expiration_stamp_is_a_miss() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone());

    store.set("k", r#"{"name":"alpha","count":3}"#).unwrap();
    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn entry_with_unexpected_shape_is_a_miss() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone());

    let raw = format!(r#"{{"different":true,"expire_at":{}}}"#, now_millis() + 60_000);
    store.set("k", &raw).unwrap();

    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
  }

  #[test]
  fn replace_expired_keeps_a_valid_entry() {
    let cache = ExpiringCache::new(MemoryStore::new());
    let newer = Sample {
      name: "beta".to_string(),
      count: 9,
    };

    cache.add("k", &sample()).unwrap();
    cache.replace_expired("k", &newer).unwrap();

    assert_eq!(cache.get::<Sample>("k").unwrap(), Some(sample()));
  }

  #[test]
  fn replace_expired_writes_over_an_expired_entry() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone());

    store
      .set("k", r#"{"name":"alpha","count":3,"expire_at":1}"#)
      .unwrap();
    cache.replace_expired("k", &sample()).unwrap();

    assert_eq!(cache.get::<Sample>("k").unwrap(), Some(sample()));
  }

  #[test]
  fn replace_expired_fills_an_absent_entry() {
    let cache = ExpiringCache::new(MemoryStore::new());

    cache.replace_expired("k", &sample()).unwrap();
    assert_eq!(cache.get::<Sample>("k").unwrap(), Some(sample()));
  }

  #[test]
  fn force_refresh_turns_every_read_into_a_miss() {
    let store = MemoryStore::new();
    let cache = ExpiringCache::new(store.clone())
      .with_ttl(Duration::days(365))
      .with_force_refresh(true);

    cache.add("k", &sample()).unwrap();

    assert_eq!(cache.get::<Sample>("k").unwrap(), None);
    // The raw entry is still there, only reads bypass it.
    assert!(store.get("k").unwrap().is_some());
  }

  #[test]
  fn force_refresh_lets_replace_expired_overwrite() {
    let store = MemoryStore::new();
    let busting = ExpiringCache::new(store.clone()).with_force_refresh(true);
    let plain = ExpiringCache::new(store);
    let newer = Sample {
      name: "beta".to_string(),
      count: 9,
    };

    busting.add("k", &sample()).unwrap();
    busting.replace_expired("k", &newer).unwrap();

    assert_eq!(plain.get::<Sample>("k").unwrap(), Some(newer));
  }

  #[test]
  fn store_failures_propagate() {
    struct FailingStore;

    impl BackingStore for FailingStore {
      fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(eyre!("read failed"))
      }

      fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(eyre!("write failed"))
      }

      fn remove(&self, _key: &str) -> Result<()> {
        Err(eyre!("remove failed"))
      }
    }

    let cache = ExpiringCache::new(FailingStore);

    assert!(cache.get::<Sample>("k").is_err());
    assert!(cache.add("k", &sample()).is_err());
    assert!(cache.replace_expired("k", &sample()).is_err());
  }

  #[test]
  fn non_object_values_are_rejected() {
    let cache = ExpiringCache::new(MemoryStore::new());
    assert!(cache.add("k", &7).is_err());
  }
}
