use crate::cache::{CacheEntry, CacheStorage};

/// Storage that never keeps anything. Every fetch is a miss and every save
/// reports failure, so a strategy over it always goes to the network.
pub struct NoCache;

impl CacheStorage for NoCache {
    fn fetch(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    fn save(&self, _key: &str, _entry: &CacheEntry) -> bool {
        false
    }

    fn delete(&self, _key: &str) -> bool {
        true
    }
}
