//! Bounded cache of composited tiles.

use moka::sync::Cache;

/// Encoded tiles keyed by their versioned cache key.
///
/// Keys embed the registry version, so stale entries are never hit; they
/// are evicted once the cache is full or dropped when the registry clears
/// it on invalidation.
#[derive(Clone)]
pub struct TileCache {
    tiles: Cache<String, Vec<u8>>,
    capacity: u64,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1) as u64;
        Self {
            tiles: Cache::builder().max_capacity(capacity).build(),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.tiles.get(key)
    }

    pub fn insert(&self, key: String, bytes: Vec<u8>) {
        self.tiles.insert(key, bytes);
    }

    pub fn clear(&self) {
        self.tiles.invalidate_all();
    }

    /// Entry count once pending evictions have been applied.
    pub fn len(&self) -> usize {
        self.tiles.run_pending_tasks();
        self.tiles.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("entries", &self.tiles.entry_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_insert() {
        let cache = TileCache::new(4);
        assert!(cache.get("a").is_none());
        cache.insert("a".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get("a"), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stays_within_capacity() {
        let cache = TileCache::new(4);
        for i in 0..64u8 {
            cache.insert(format!("tile-{}", i), vec![i]);
        }
        assert!(cache.len() <= 4);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let cache = TileCache::new(2);
        cache.insert("a".to_string(), vec![1]);
        cache.insert("a".to_string(), vec![9]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(vec![9]));
    }

    #[test]
    fn test_clear() {
        let cache = TileCache::new(2);
        cache.insert("a".to_string(), vec![1]);
        cache.clear();
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = TileCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a".to_string(), vec![1]);
        assert_eq!(cache.get("a"), Some(vec![1]));
    }
}
