use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use bytes::Bytes;
use parking_lot::Mutex;

/// Key for proxied GLB payloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GlbKey {
    /// Asset-store object id.
    Object(String),
    /// Catalog URL fetched on behalf of a world.
    WorldObject { world_id: String, url: String },
}

/// Decides which entries leave the cache.
pub trait EvictionPolicy<K>: Send {
    /// Called after `key` was inserted; returns keys to drop.
    fn on_insert(&mut self, key: &K) -> Vec<K>;

    fn on_hit(&mut self, _key: &K) {}

    fn on_remove(&mut self, _key: &K) {}
}

/// Keeps everything for the life of the cache.
#[derive(Default)]
pub struct Unbounded;

impl<K> EvictionPolicy<K> for Unbounded {
    fn on_insert(&mut self, _key: &K) -> Vec<K> {
        Vec::new()
    }
}

/// Least-recently-used, bounded by entry count.
pub struct Lru<K> {
    capacity: usize,
    order: VecDeque<K>,
}

impl<K> Lru<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
        }
    }
}

impl<K: Clone + PartialEq + Send> EvictionPolicy<K> for Lru<K> {
    fn on_insert(&mut self, key: &K) -> Vec<K> {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    fn on_hit(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn on_remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }
}

struct Inner<K> {
    entries: HashMap<K, Bytes>,
    policy: Box<dyn EvictionPolicy<K>>,
}

/// In-memory binary cache owned by the application state.
///
/// Writes are insert-if-absent: two requests racing on the same key both
/// fetch, and whichever stores first wins.
pub struct BlobCache<K> {
    inner: Mutex<Inner<K>>,
}

impl<K: Eq + Hash + Clone + 'static> BlobCache<K> {
    pub fn unbounded() -> Self {
        Self::with_policy(Box::new(Unbounded))
    }

    pub fn with_policy(policy: Box<dyn EvictionPolicy<K>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                policy,
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let hit = inner.entries.get(key).cloned();
        if hit.is_some() {
            inner.policy.on_hit(key);
        }
        hit
    }

    /// Store `value` unless the key is already present; returns the stored value.
    pub fn insert_if_absent(&self, key: K, value: Bytes) -> Bytes {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.entries.get(&key) {
            return existing.clone();
        }
        inner.entries.insert(key.clone(), value.clone());
        let evicted = inner.policy.on_insert(&key);
        for old in evicted {
            inner.entries.remove(&old);
        }
        value
    }

    pub fn remove(&self, key: &K) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(key);
        if removed.is_some() {
            inner.policy.on_remove(key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type GlbCache = BlobCache<GlbKey>;

/// Build the GLB cache from the configured bound.
pub fn glb_cache(max_entries: Option<usize>) -> GlbCache {
    match max_entries {
        Some(n) => bounded_glb_cache(n),
        None => BlobCache::unbounded(),
    }
}

pub fn bounded_glb_cache(max_entries: usize) -> GlbCache {
    BlobCache::with_policy(Box::new(Lru::new(max_entries)))
}
