//! Bounded LRU caches for discriminators and derived addresses.
//!
//! Both caches are plain instances: a coder owns one, or a caller builds
//! one and shares it behind an `Arc`. Each guards its state with a single
//! mutex. Values go in and come out by copy.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::discriminator::{self, Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::error::{CoderError, CoderResult, PdaError};
use crate::pda::{self, PdaResult, PdaSeed};
use crate::pubkey::Pubkey;

pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub max_size: usize,
    /// When false every cache call is a no-op.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CACHE_SIZE,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    fn validate(&self) -> CoderResult<()> {
        if self.max_size == 0 {
            return Err(CoderError::invalid_argument("cache max_size must be at least 1"));
        }
        Ok(())
    }
}

/// Counters snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ─── Generic LRU ─────────────────────────────────────────────────

/// Strict recency order comes from `lru`; the counters live beside it.
struct LruState<K, V> {
    entries: lru::LruCache<K, V>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash, V: Copy> LruState<K, V> {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: lru::LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key).copied() {
            Some(value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh. Returns true when an entry was evicted.
    fn put(&mut self, key: K, value: V) -> bool {
        if self.entries.contains(&key) {
            self.entries.put(key, value);
            return false;
        }
        // `push` hands back the displaced entry only when full.
        let evicted = self.entries.push(key, value).is_some();
        if evicted {
            self.evictions += 1;
        }
        evicted
    }

    fn remove(&mut self, key: &K) -> bool {
        self.entries.pop(key).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }
}

/// Mutex-guarded LRU map with hit/miss/eviction counters.
pub struct LruCache<K, V> {
    config: CacheConfig,
    state: Mutex<LruState<K, V>>,
}

impl<K: Eq + Hash, V: Copy> LruCache<K, V> {
    pub fn new(config: CacheConfig) -> CoderResult<Self> {
        config.validate()?;
        Ok(Self::new_unchecked(config))
    }

    fn new_unchecked(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LruState::new(
                NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    // Every method leaves the state consistent before it can panic, so a
    // poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, LruState<K, V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if !self.config.enabled {
            return None;
        }
        self.lock().get(key)
    }

    /// Insert a value. Returns true when the insert evicted another entry.
    pub fn put(&self, key: K, value: V) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.lock().put(key, value)
    }

    pub fn remove(&self, key: &K) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.config.enabled && self.lock().entries.contains(key)
    }

    pub fn clear(&self) {
        if self.config.enabled {
            self.lock().clear();
        }
    }

    pub fn len(&self) -> usize {
        if !self.config.enabled {
            return 0;
        }
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        if !self.config.enabled {
            return CacheStats {
                max_size: self.config.max_size,
                ..CacheStats::default()
            };
        }
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            size: state.entries.len(),
            max_size: self.config.max_size,
        }
    }

    pub fn reset_stats(&self) {
        if self.config.enabled {
            self.lock().reset_stats();
        }
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache").field("config", &self.config).finish_non_exhaustive()
    }
}

// ─── Discriminator cache ─────────────────────────────────────────

/// Discriminators keyed by their namespace-qualified preimage, e.g.
/// `account:Data`.
#[derive(Debug)]
pub struct DiscriminatorCache {
    inner: LruCache<String, Discriminator>,
}

impl Default for DiscriminatorCache {
    fn default() -> Self {
        Self {
            inner: LruCache::new_unchecked(CacheConfig::default()),
        }
    }
}

impl DiscriminatorCache {
    pub fn new(config: CacheConfig) -> CoderResult<Self> {
        Ok(Self {
            inner: LruCache::new(config)?,
        })
    }

    pub fn get(&self, key: &str) -> Option<Discriminator> {
        let found = self.inner.get(&key.to_string());
        if self.inner.is_enabled() {
            trace!(key, hit = found.is_some(), "discriminator cache lookup");
        }
        found
    }

    /// Store a discriminator. Anything but exactly 8 bytes is rejected.
    pub fn put(&self, key: &str, bytes: &[u8]) -> CoderResult<()> {
        let value = discriminator::from_slice(bytes).ok_or_else(|| {
            CoderError::invalid_argument(format!(
                "discriminator for `{key}` must be {DISCRIMINATOR_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        if self.inner.put(key.to_string(), value) {
            trace!(key, "discriminator cache evicted an entry");
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.remove(&key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(&key.to_string())
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Bulk insert. A no-op on a disabled cache.
    pub fn warm<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, Discriminator)>) {
        if !self.inner.is_enabled() {
            return;
        }
        for (key, value) in entries {
            self.inner.put(key.into(), value);
        }
    }

    /// Look up `<namespace>:<name>`, computing and storing it on a miss.
    pub fn get_or_compute(&self, namespace: Namespace, name: &str) -> CoderResult<Discriminator> {
        let key = discriminator::preimage(namespace, name);
        if let Some(found) = self.get(&key) {
            return Ok(found);
        }
        let computed = discriminator::compute(namespace, name)?;
        self.inner.put(key, computed);
        Ok(computed)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    pub fn reset_stats(&self) {
        self.inner.reset_stats();
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config()
    }
}

// ─── PDA cache ───────────────────────────────────────────────────

/// Program id plus the ordered, already-encoded seeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdaCacheKey {
    pub program_id: Pubkey,
    pub seeds: Vec<Vec<u8>>,
}

impl PdaCacheKey {
    pub fn new(seeds: &[Vec<u8>], program_id: &Pubkey) -> Self {
        Self {
            program_id: *program_id,
            seeds: seeds.to_vec(),
        }
    }
}

/// Memoizes the bump search.
#[derive(Debug)]
pub struct PdaCache {
    inner: LruCache<PdaCacheKey, PdaResult>,
}

impl Default for PdaCache {
    fn default() -> Self {
        Self {
            inner: LruCache::new_unchecked(CacheConfig::default()),
        }
    }
}

impl PdaCache {
    pub fn new(config: CacheConfig) -> CoderResult<Self> {
        Ok(Self {
            inner: LruCache::new(config)?,
        })
    }

    pub fn get(&self, key: &PdaCacheKey) -> Option<PdaResult> {
        self.inner.get(key)
    }

    pub fn put(&self, key: PdaCacheKey, result: PdaResult) {
        if self.inner.put(key, result) {
            trace!("pda cache evicted an entry");
        }
    }

    pub fn remove(&self, key: &PdaCacheKey) -> bool {
        self.inner.remove(key)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn warm(&self, entries: impl IntoIterator<Item = (PdaCacheKey, PdaResult)>) {
        if !self.inner.is_enabled() {
            return;
        }
        for (key, value) in entries {
            self.inner.put(key, value);
        }
    }

    /// Derive through the cache. Seeds are validated before lookup, and
    /// the bump search runs outside the lock.
    pub fn find_program_address(&self, seeds: &[PdaSeed], program_id: &Pubkey) -> Result<PdaResult, PdaError> {
        let encoded = pda::encode_seeds(seeds)?;
        self.find_program_address_raw(&encoded, program_id)
    }

    pub fn find_program_address_raw(&self, seeds: &[Vec<u8>], program_id: &Pubkey) -> Result<PdaResult, PdaError> {
        let key = PdaCacheKey::new(seeds, program_id);
        if let Some(found) = self.inner.get(&key) {
            trace!(program_id = %program_id, bump = found.bump, "pda cache hit");
            return Ok(found);
        }
        let slices: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
        let result = pda::find_program_address_raw(&slices, program_id)?;
        self.put(key, result);
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    pub fn reset_stats(&self) {
        self.inner.reset_stats();
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config()
    }
}
