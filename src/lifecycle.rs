//! Lifecycle & Task Queue (§4.7): `get_tile`, touch/LRU-promotion, load
//! task submission, dirty-marking, and draining the pending-dispose queue.
//!
//! Grounded on the teacher's `scheduler::get_tile`/`load_tile_for_prefetch`
//! dedup pattern (at most one in-flight load per cache entry), adapted to
//! a single-threaded, fire-and-forget task queue instead of the teacher's
//! rayon-backed async decode pipeline.

use std::collections::HashSet;

use crate::cache::TileCache;
use crate::datasource::DataSource;
use crate::key::{CacheKey, TileKey, TileOffset};
use crate::tile::TileHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskGroup {
    FetchAndDecode,
}

/// A unit of work submitted to the priority task queue. The core never
/// awaits it — it only observes the tile's mutated state on a later frame.
#[derive(Debug, Clone)]
pub struct LoadTask {
    pub tile: TileHandle,
    pub group: TaskGroup,
}

impl LoadTask {
    pub fn execute(&self) {
        self.tile.borrow_mut().load();
    }

    /// Evaluated at dispatch time, not at submission time.
    pub fn get_priority(&self) -> f64 {
        self.tile.borrow().loader_priority()
    }

    pub fn is_expired(&self) -> bool {
        !self.tile.borrow().is_visible
    }

    pub fn estimated_process_time(&self) -> f64 {
        1.0
    }
}

/// The external priority task queue. The core only submits; dispatch,
/// prioritisation, and expiry filtering are the queue's own concern.
pub trait TaskQueue: std::fmt::Debug {
    fn submit(&mut self, task: LoadTask);
}

/// A queue that runs tasks synchronously on submission. Useful for tests
/// and for embedding the core in a renderer with no real worker pool.
#[derive(Debug, Default)]
pub struct ImmediateTaskQueue {
    pub submitted: Vec<LoadTask>,
}

impl TaskQueue for ImmediateTaskQueue {
    fn submit(&mut self, task: LoadTask) {
        task.execute();
        self.submitted.push(task);
    }
}

/// Resolves a tile for `(data_source, tile_key, offset)`, per §4.7.
///
/// Non-cacheable datasources get a fresh tile on every call. Cacheable
/// ones are looked up by morton code; an offset mismatch on what would
/// otherwise be a hit is treated as a miss (the stale entry is evicted via
/// `delete`, bypassing the eviction callback, and a fresh tile takes its
/// place under the same key).
pub fn get_tile(
    cache: &mut TileCache,
    task_queue: &mut dyn TaskQueue,
    data_source: &dyn DataSource,
    tile_key: TileKey,
    offset: TileOffset,
    frame_number: i64,
) -> Option<TileHandle> {
    if !data_source.cacheable() {
        let tile = data_source.get_tile(tile_key, true)?;
        tile.borrow_mut().set_offset(offset);
        tile.borrow_mut().touch(frame_number);
        task_queue.submit(LoadTask { tile: tile.clone(), group: TaskGroup::FetchAndDecode });
        return Some(tile);
    }

    let morton = tile_key.morton_code();
    if let Some((existing_key, tile)) = cache.find_by_morton(data_source.name(), morton) {
        if tile.borrow().offset == offset {
            cache.get(&existing_key);
            tile.borrow_mut().touch(frame_number);
            return Some(tile);
        }
        cache.delete(&existing_key);
    }

    let tile = data_source.get_tile(tile_key, true)?;
    tile.borrow_mut().set_offset(offset);
    tile.borrow_mut().touch(frame_number);
    let cache_key = CacheKey::new(data_source.name(), &tile_key, offset);
    cache.set(cache_key, tile.clone());
    task_queue.submit(LoadTask { tile: tile.clone(), group: TaskGroup::FetchAndDecode });
    Some(tile)
}

/// Cache-only lookup: never creates, never schedules, never touches.
/// Calling this for a non-cacheable datasource is a development-only
/// invariant violation — there's nothing to find in the shared cache.
pub fn get_cached_tile(cache: &mut TileCache, data_source: &dyn DataSource, tile_key: &TileKey, offset: TileOffset) -> Option<TileHandle> {
    debug_assert!(data_source.cacheable(), "get_cached_tile called on a non-cacheable datasource");
    let cache_key = CacheKey::new(data_source.name(), tile_key, offset);
    cache.get(&cache_key)
}

/// Resubmits a load task for every tile in `tiles` matching `filter`
/// (dedup'd via a retained set keyed by `(data_source_name, morton)`), then
/// disposes any cache entry of `data_source` that wasn't retained,
/// bypassing the eviction callback.
///
/// `data_source = None` targets every datasource's cache entries, per
/// spec.md's `markTilesDirty(dataSource?, filter?)`. `filter = None` keeps
/// every tile in `tiles` (the no-op default matching an omitted filter).
pub fn mark_tiles_dirty(
    cache: &mut TileCache,
    task_queue: &mut dyn TaskQueue,
    data_source: Option<&dyn DataSource>,
    tiles: impl IntoIterator<Item = TileHandle>,
    filter: Option<&dyn Fn(&TileHandle) -> bool>,
) {
    let mut retained: HashSet<(String, u64)> = HashSet::new();

    for tile in tiles {
        if let Some(filter) = filter {
            if !filter(&tile) {
                continue;
            }
        }
        let (name, morton) = {
            let t = tile.borrow();
            (t.data_source_name.clone(), t.tile_key.morton_code())
        };
        if retained.insert((name, morton)) {
            task_queue.submit(LoadTask { tile: tile.clone(), group: TaskGroup::FetchAndDecode });
        }
    }

    let target_name = data_source.map(|ds| ds.name());
    let stale: Vec<CacheKey> = {
        let mut keys = Vec::new();
        cache.for_each(target_name, |key, _| {
            if !retained.contains(&(key.data_source_name.clone(), key.morton)) {
                keys.push(key.clone());
            }
        });
        keys
    };

    for key in stale {
        if let Some(tile) = cache.delete(&key) {
            tile.borrow_mut().dispose();
        }
    }
}

/// Drains the cache's pending-dispose queue. Calling this twice in a row
/// behaves like calling it once: the queue is empty after the first call,
/// and `Tile::dispose` is itself idempotent.
pub fn dispose_pending_tiles(cache: &mut TileCache) {
    cache.drain_pending_dispose();
}
