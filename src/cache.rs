//! Tile Cache: an LRU store keyed by `(datasource, morton, offset)`, with
//! pluggable size accounting and a visibility-pinned can-evict predicate.
//!
//! Grounded on the teacher's `cache::TileCache` (hand-rolled map plus an
//! explicit LRU order, `evict_if_needed` loop) and, for the typed
//! config/stats shape, on `meridian-map-engine`'s `tile::cache::TileCache`.
//! Single-threaded (§5): no lock is needed around the map, unlike the
//! teacher's `DashMap`/`Mutex<VecDeque>` pair built for a multi-threaded
//! scheduler.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::key::CacheKey;
use crate::tile::TileHandle;

/// Which unit `TileCache` measures tiles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceComputationType {
    /// `tile.memory_usage() / 2^20`.
    EstimationInMb,
    /// A flat `1` per tile, regardless of size.
    NumberOfTiles,
}

fn measure(tile: &TileHandle, mode: ResourceComputationType) -> f64 {
    match mode {
        ResourceComputationType::EstimationInMb => tile.borrow().memory_usage() as f64 / (1024.0 * 1024.0),
        ResourceComputationType::NumberOfTiles => 1.0,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// LRU tile cache. `capacity` and the running size total share the same
/// unit, selected by `mode`.
pub struct TileCache {
    capacity: f64,
    mode: ResourceComputationType,
    entries: HashMap<CacheKey, TileHandle>,
    /// Front = least-recently-used, back = most-recently-used.
    order: VecDeque<CacheKey>,
    pending_dispose: Vec<TileHandle>,
    stats: CacheStats,
}

impl TileCache {
    pub fn new(capacity: f64, mode: ResourceComputationType) -> Self {
        TileCache {
            capacity,
            mode,
            entries: HashMap::new(),
            order: VecDeque::new(),
            pending_dispose: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Returns the tile without promoting if absent; promotes to MRU on hit.
    pub fn get(&mut self, key: &CacheKey) -> Option<TileHandle> {
        if let Some(tile) = self.entries.get(key).cloned() {
            self.promote(key);
            self.stats.hits += 1;
            Some(tile)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Finds an entry for `data_source_name`/`morton` regardless of its
    /// offset. Used by the lifecycle's `get_tile` to detect an offset
    /// mismatch on what would otherwise be a hit (see `DESIGN.md`'s Open
    /// Question decision #2).
    pub fn find_by_morton(&self, data_source_name: &str, morton: u64) -> Option<(CacheKey, TileHandle)> {
        self.entries
            .iter()
            .find(|(key, _)| key.data_source_name == data_source_name && key.morton == morton)
            .map(|(key, tile)| (key.clone(), tile.clone()))
    }

    /// Inserts or replaces an entry. May push the measured total over
    /// capacity; shrinkage is deferred to `shrink_to_capacity`.
    pub fn set(&mut self, key: CacheKey, tile: TileHandle) {
        if self.entries.contains_key(&key) {
            self.remove_from_order(&key);
        }
        self.entries.insert(key.clone(), tile);
        self.order.push_back(key);
    }

    /// Explicit removal: the eviction callback is *not* invoked, so the
    /// loader is not cancelled and the tile is not queued for disposal.
    pub fn delete(&mut self, key: &CacheKey) -> Option<TileHandle> {
        self.remove_from_order(key);
        self.entries.remove(key)
    }

    /// Evicts LRU entries, skipping any that can't be evicted (`isVisible`
    /// tiles), until the measured total is at or under capacity or no
    /// evictable entry remains.
    pub fn shrink_to_capacity(&mut self) {
        loop {
            if self.total_size() <= self.capacity {
                break;
            }
            let victim = self
                .order
                .iter()
                .find(|key| self.can_evict(key))
                .cloned();
            match victim {
                Some(key) => self.evict(&key),
                None => break,
            }
        }
    }

    /// Forces eviction of every entry regardless of `can_evict`.
    pub fn evict_all(&mut self) {
        let keys: Vec<CacheKey> = self.order.iter().cloned().collect();
        for key in keys {
            self.evict(&key);
        }
    }

    /// Forces eviction of every entry matching `predicate`, regardless of
    /// `can_evict`.
    pub fn evict_selected(&mut self, predicate: impl Fn(&TileHandle) -> bool) {
        let keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, tile)| predicate(tile))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            self.evict(&key);
        }
    }

    pub fn set_capacity(&mut self, capacity: f64, mode: ResourceComputationType) {
        self.capacity = capacity;
        self.mode = mode;
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn mode(&self) -> ResourceComputationType {
        self.mode
    }

    pub fn total_size(&self) -> f64 {
        self.entries.values().map(|tile| measure(tile, self.mode)).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn for_each(&self, data_source: Option<&str>, mut callback: impl FnMut(&CacheKey, &TileHandle)) {
        for (key, tile) in self.entries.iter() {
            if let Some(name) = data_source {
                if key.data_source_name != name {
                    continue;
                }
            }
            callback(key, tile);
        }
    }

    /// Drains the pending-dispose queue, disposing each tile. Idempotent:
    /// `Tile::dispose` is itself idempotent, and the queue is empty after
    /// the first drain, so a second call is a no-op.
    pub fn drain_pending_dispose(&mut self) {
        for tile in self.pending_dispose.drain(..) {
            tile.borrow_mut().dispose();
        }
    }

    pub fn pending_dispose_len(&self) -> usize {
        self.pending_dispose.len()
    }

    fn can_evict(&self, key: &CacheKey) -> bool {
        self.entries.get(key).map(|tile| !tile.borrow().is_visible).unwrap_or(false)
    }

    fn evict(&mut self, key: &CacheKey) {
        self.remove_from_order(key);
        if let Some(tile) = self.entries.remove(key) {
            tile.borrow_mut().cancel_loader();
            self.pending_dispose.push(tile);
            self.stats.evictions += 1;
        }
    }

    fn promote(&mut self, key: &CacheKey) {
        self.remove_from_order(key);
        self.order.push_back(key.clone());
    }

    fn remove_from_order(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}
