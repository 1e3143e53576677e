use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Key → value store with explicit invalidation, injected into the API layer.
pub trait Cache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn insert(&self, key: K, value: V);
    fn invalidate(&self, key: &K);
    fn clear(&self);
}

/// Process-local cache. Cloning shares the same entries.
pub struct MemoryCache<K, V> {
    entries: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        MemoryCache {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        MemoryCache {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> MemoryCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value);
        }
    }

    fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_invalidate_clear() {
        let cache: MemoryCache<String, u32> = MemoryCache::new();
        assert!(cache.is_empty());

        cache.insert("la-liga".to_string(), 20);
        cache.insert("serie-a".to_string(), 20);
        assert_eq!(cache.get(&"la-liga".to_string()), Some(20));

        cache.invalidate(&"la-liga".to_string());
        assert_eq!(cache.get(&"la-liga".to_string()), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: MemoryCache<&'static str, &'static str> = MemoryCache::new();
        let shared = cache.clone();
        shared.insert("k", "v");
        assert_eq!(cache.get(&"k"), Some("v"));
    }

    #[test]
    fn test_usable_as_trait_object() {
        let cache: Box<dyn Cache<String, String>> = Box::new(MemoryCache::new());
        cache.insert("a".into(), "b".into());
        assert_eq!(cache.get(&"a".to_string()).as_deref(), Some("b"));
    }
}
