//! In-memory TTL cache with a pluggable eviction policy (§4.I).
//!
//! Grounded on the teacher's `utils/cache.rs` `Cache<T>`, which hardcodes
//! LRU eviction and spawns an unjoinable cleanup thread. Generalised here
//! to an `EvictionPolicy` enum and a joinable cleanup thread guarded by an
//! `Arc<AtomicBool>`, stopped via `shutdown()`/`Drop`.

use log::debug;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    Lru,
    Lfu,
    Fifo,
    Random,
}

#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    /// `None` means "no expiry" (§4.I: a zero TTL never expires).
    expires_at: Option<Instant>,
    hit_count: u64,
    last_accessed: Instant,
}

impl<T> CacheEntry<T> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now <= at)
    }
}

struct SharedState<T> {
    store: Mutex<HashMap<String, CacheEntry<T>>>,
    max_size: usize,
    policy: EvictionPolicy,
}

impl<T: Clone> SharedState<T> {
    fn evict_one(&self, map: &mut HashMap<String, CacheEntry<T>>) {
        let victim = match self.policy {
            EvictionPolicy::Lru => map
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone()),
            EvictionPolicy::Lfu => map
                .iter()
                .min_by_key(|(_, e)| e.hit_count)
                .map(|(k, _)| k.clone()),
            EvictionPolicy::Fifo => map
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone()),
            EvictionPolicy::Random => {
                let idx = rand::thread_rng().gen_range(0..map.len().max(1));
                map.keys().nth(idx).cloned()
            }
        };
        if let Some(key) = victim {
            map.remove(&key);
        }
    }
}

/// A TTL-bounded, size-bounded in-memory cache with background expiry
/// sweeps (§4.I).
pub struct MemoryCache<T: Clone + Send + 'static> {
    state: Arc<SharedState<T>>,
    default_ttl: Duration,
    running: Arc<AtomicBool>,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> MemoryCache<T> {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_options(default_ttl, 1000, EvictionPolicy::Lru, Duration::from_secs(60))
    }

    pub fn with_options(
        default_ttl: Duration,
        max_size: usize,
        policy: EvictionPolicy,
        cleanup_interval: Duration,
    ) -> Self {
        let state = Arc::new(SharedState {
            store: Mutex::new(HashMap::new()),
            max_size,
            policy,
        });
        let running = Arc::new(AtomicBool::new(true));
        let handle = {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(cleanup_interval);
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    let mut map = state.store.lock().unwrap();
                    let now = Instant::now();
                    let before = map.len();
                    map.retain(|_, e| e.is_live(now));
                    let removed = before - map.len();
                    if removed > 0 {
                        debug!("expired {removed} in-memory cache entr(y/ies)");
                    }
                }
            })
        };
        Self {
            state,
            default_ttl,
            running,
            cleanup_handle: Mutex::new(Some(handle)),
        }
    }

    pub fn set(&self, key: &str, value: T) {
        self.set_with_ttl(key, value, None);
    }

    /// `ttl = Some(Duration::ZERO)` means "no expiry" (§4.I); `None` falls
    /// back to `default_ttl`, itself subject to the same zero-means-forever
    /// rule.
    pub fn set_with_ttl(&self, key: &str, value: T, ttl: Option<Duration>) {
        let mut map = self.state.store.lock().unwrap();
        let now = Instant::now();
        let effective_ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: if effective_ttl.is_zero() { None } else { Some(now + effective_ttl) },
            hit_count: 0,
            last_accessed: now,
        };
        if map.len() >= self.state.max_size && !map.contains_key(key) {
            self.state.evict_one(&mut map);
        }
        map.insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let mut map = self.state.store.lock().unwrap();
        if let Some(entry) = map.get_mut(key) {
            let now = Instant::now();
            if entry.is_live(now) {
                entry.hit_count += 1;
                entry.last_accessed = now;
                return Some(entry.value.clone());
            }
            map.remove(key);
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let map = self.state.store.lock().unwrap();
        let now = Instant::now();
        matches!(map.get(key), Some(e) if e.is_live(now))
    }

    /// Removes `key`, returning its value if present (§4.I `remove(k)`).
    pub fn remove(&self, key: &str) -> Option<T> {
        self.state.store.lock().unwrap().remove(key).map(|e| e.value)
    }

    /// Drops every entry (§4.I `clear()`).
    pub fn clear(&self) {
        self.state.store.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.state.store.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweeps expired entries immediately, returning how many were removed
    /// (§4.I `cleanup_expired()`; also runs automatically on the
    /// background cleanup interval).
    pub fn cleanup_expired(&self) -> usize {
        let mut map = self.state.store.lock().unwrap();
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, e| e.is_live(now));
        before - map.len()
    }

    /// Stops the cleanup thread and waits for it to exit.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.cleanup_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl<T: Clone + Send + 'static> Drop for MemoryCache<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k", 42);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache: MemoryCache<i32> = MemoryCache::with_options(
            Duration::from_millis(10),
            100,
            EvictionPolicy::Lru,
            Duration::from_secs(60),
        );
        cache.set("k", 1);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn zero_ttl_never_expires() {
        let cache: MemoryCache<i32> = MemoryCache::with_options(
            Duration::from_millis(10),
            100,
            EvictionPolicy::Lru,
            Duration::from_secs(60),
        );
        cache.set_with_ttl("k", 1, Some(Duration::ZERO));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn lru_eviction_drops_the_least_recently_used_entry() {
        let cache: MemoryCache<i32> =
            MemoryCache::with_options(Duration::from_secs(60), 2, EvictionPolicy::Lru, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        // touch "a" so "b" becomes the least recently used
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);
        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn fifo_eviction_drops_the_oldest_entry_regardless_of_access() {
        let cache: MemoryCache<i32> = MemoryCache::with_options(
            Duration::from_secs(60),
            2,
            EvictionPolicy::Fifo,
            Duration::from_secs(60),
        );
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);
        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn shutdown_joins_the_cleanup_thread() {
        let cache: MemoryCache<i32> = MemoryCache::new(Duration::from_secs(60));
        cache.shutdown();
    }

    #[test]
    fn remove_drops_a_single_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.remove("a"), Some(1));
        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
    }

    #[test]
    fn clear_drops_every_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn cleanup_expired_sweeps_immediately_without_waiting_for_the_background_interval() {
        let cache: MemoryCache<i32> = MemoryCache::with_options(
            Duration::from_millis(10),
            100,
            EvictionPolicy::Lru,
            Duration::from_secs(600),
        );
        cache.set("a", 1);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 0);
    }
}
