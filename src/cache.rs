//! Private HTTP cache: the decision engine ([`CacheStrategy`]), the stored
//! [`CacheEntry`] and the [`CacheStorage`] backends it persists into.

use std::sync::Arc;

pub mod entry;
pub mod filesystem;
pub mod inmemory;
pub mod key;
pub mod nocache;
pub mod strategy;

pub use entry::CacheEntry;
pub use filesystem::FileStorage;
pub use inmemory::InMemoryStorage;
pub use key::CacheKey;
pub use nocache::NoCache;
pub use strategy::CacheStrategy;

/// Key to entry persistence. Backends never fail loudly: a missing or
/// undecodable entry is `None`, a failed write or delete is `false`.
pub trait CacheStorage: Send + Sync {
    fn fetch(&self, key: &str) -> Option<CacheEntry>;
    /// Store `entry` under `key`, replacing any previous one.
    fn save(&self, key: &str, entry: &CacheEntry) -> bool;
    /// Remove the entry stored under `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> bool;
}

impl<T: CacheStorage + ?Sized> CacheStorage for Arc<T> {
    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        self.as_ref().fetch(key)
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> bool {
        self.as_ref().save(key, entry)
    }

    fn delete(&self, key: &str) -> bool {
        self.as_ref().delete(key)
    }
}

impl<T: CacheStorage + ?Sized> CacheStorage for &T {
    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        (**self).fetch(key)
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> bool {
        (**self).save(key, entry)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }
}

impl<T: CacheStorage + ?Sized> CacheStorage for Box<T> {
    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        self.as_ref().fetch(key)
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> bool {
        self.as_ref().save(key, entry)
    }

    fn delete(&self, key: &str) -> bool {
        self.as_ref().delete(key)
    }
}
