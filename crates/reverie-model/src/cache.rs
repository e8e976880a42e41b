//! Bounded in-memory cache for identical-text embeddings.
//!
//! The client remembers recent results keyed by a hash of the text.
//! Caching is an optimization only; a miss always falls through to the
//! service.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Fixed-capacity embedding cache with oldest-first eviction.
#[derive(Debug)]
pub struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<u64, Vec<f32>>,
    order: VecDeque<u64>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Look up the cached embedding for `text`.
    pub fn get(&self, text: &str) -> Option<&Vec<f32>> {
        self.entries.get(&text_key(text))
    }

    /// Insert an embedding, evicting the oldest entry if at capacity.
    ///
    /// A zero-capacity cache stores nothing.
    pub fn insert(&mut self, text: &str, embedding: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        let key = text_key(text);
        if self.entries.contains_key(&key) {
            self.entries.insert(key, embedding);
            return;
        }
        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, embedding);
        self.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn text_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = EmbeddingCache::new(4);
        cache.insert("hello", vec![1.0, 2.0]);

        assert_eq!(cache.get("hello"), Some(&vec![1.0, 2.0]));
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut cache = EmbeddingCache::new(2);
        cache.insert("one", vec![1.0]);
        cache.insert("two", vec![2.0]);
        cache.insert("three", vec![3.0]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("one").is_none());
        assert!(cache.get("two").is_some());
        assert!(cache.get("three").is_some());
    }

    #[test]
    fn test_reinsert_updates_without_eviction() {
        let mut cache = EmbeddingCache::new(2);
        cache.insert("one", vec![1.0]);
        cache.insert("two", vec![2.0]);
        cache.insert("one", vec![9.0]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("one"), Some(&vec![9.0]));
        assert!(cache.get("two").is_some());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = EmbeddingCache::new(0);
        cache.insert("hello", vec![1.0]);
        assert!(cache.is_empty());
        assert!(cache.get("hello").is_none());
    }
}
