//! Bounded resolution cache with insertion-order eviction.

use std::collections::VecDeque;

use hashbrown::HashMap;

use super::Resolution;

/// Cache key: BLAKE3 digest of the normalized name.
pub type CacheKey = blake3::Hash;

pub fn cache_key(normalized: &str) -> CacheKey {
    blake3::hash(normalized.as_bytes())
}

/// Insertion-ordered map. Reads never reorder; the oldest insert is
/// evicted first.
#[derive(Debug)]
pub struct ResolutionCache {
    map: HashMap<CacheKey, Resolution>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn get_mut(&mut self, key: &CacheKey) -> Option<&mut Resolution> {
        self.map.get_mut(key)
    }

    /// Insert, evicting the oldest entry first when full. Returns the
    /// evicted entry, if any.
    pub fn insert(&mut self, key: CacheKey, value: Resolution) -> Option<Resolution> {
        if let Some(existing) = self.map.get_mut(&key) {
            *existing = value;
            return None;
        }
        let mut evicted = None;
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                evicted = self.map.remove(&oldest);
            }
        }
        self.order.push_back(key);
        self.map.insert(key, value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
