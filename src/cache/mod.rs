//! Time-bounded caching over a pluggable synchronous key-value store.
//!
//! This module provides a domain-agnostic expiring cache that:
//! - Wraps any [`BackingStore`] (memory, SQLite) without owning its lifecycle
//! - Stamps every written value with an expiration instant
//! - Validates the stamp on read, degrading corrupt or stale entries to misses
//! - Offers a replace-if-expired write that never clobbers a valid entry

mod expiring;
mod store;

pub use expiring::ExpiringCache;
pub use store::{BackingStore, MemoryStore, SqliteStore};
