use std::{collections::HashMap, sync::Mutex};

use crate::cache::{CacheEntry, CacheStorage};
use crate::log_error;

/// Process local storage backed by a mutex guarded map. This is the
/// default backend of [`crate::cache::CacheStrategy::in_memory`].
#[derive(Default)]
pub struct InMemoryStorage {
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for InMemoryStorage {
    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        match self.cache.lock() {
            Ok(cache) => cache.get(key).cloned(),
            Err(_) => {
                log_error!("In-memory cache lock poisoned, treating {} as a miss", key);
                None
            }
        }
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.insert(key.to_string(), entry.clone());
                true
            }
            Err(_) => {
                log_error!("In-memory cache lock poisoned, cannot save {}", key);
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.remove(key);
                true
            }
            Err(_) => {
                log_error!("In-memory cache lock poisoned, cannot delete {}", key);
                false
            }
        }
    }
}
