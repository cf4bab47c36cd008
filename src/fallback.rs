//! Fallback Searcher (§4.6): for a tile that isn't ready yet, walks
//! ancestors up and descendants down in the cache looking for a loaded
//! substitute to render in its place.

use std::collections::HashMap;

use crate::cache::TileCache;
use crate::datasource::DataSource;
use crate::frustum::TilingScheme;
use crate::key::{CacheKey, TileKey, TileOffset};
use crate::tile::TileHandle;

/// A substitute tile found by the fallback searcher.
#[derive(Debug, Clone)]
pub struct FallbackResult {
    pub tile: TileHandle,
    /// Positive for a descendant substitute, negative for an ancestor.
    pub level_offset: i32,
}

/// Per-frame memo of ancestor lookups, avoiding repeated cache probing
/// when sibling tiles share the same ancestor chain.
pub type AncestorMemo = HashMap<(String, TileKey, TileOffset), Option<TileHandle>>;

/// Walks parent keys up to `max_up` levels (clamped to the datasource's
/// `min_data_level`), returning the first ancestor whose tile is ready.
pub fn search_ancestor(
    cache: &mut TileCache,
    data_source: &dyn DataSource,
    tile_key: &TileKey,
    offset: TileOffset,
    max_up: u32,
    memo: &mut AncestorMemo,
) -> Option<FallbackResult> {
    if !data_source.allow_overlapping_tiles() {
        return None;
    }

    let mut current = *tile_key;
    for up in 1..=max_up {
        let parent = current.parent()?;
        if parent.level < data_source.min_data_level() {
            break;
        }

        let memo_key = (data_source.name().to_string(), parent, offset);
        let found = memo
            .entry(memo_key)
            .or_insert_with(|| {
                let cache_key = CacheKey::new(data_source.name(), &parent, offset);
                cache.get(&cache_key).filter(|tile| tile.borrow().is_ready())
            })
            .clone();

        if let Some(tile) = found {
            return Some(FallbackResult { tile, level_offset: -(up as i32) });
        }
        current = parent;
    }
    None
}

/// Recurses through descendant keys up to `max_down` levels (clamped to
/// the datasource's `max_data_level`), appending every loaded descendant
/// found along the way — independent of whatever the ancestor search
/// returned (see `DESIGN.md`'s Open Question decision #1).
pub fn search_descendants(
    cache: &mut TileCache,
    data_source: &dyn DataSource,
    tiling_scheme: &dyn TilingScheme,
    tile_key: &TileKey,
    offset: TileOffset,
    max_down: u32,
    out: &mut Vec<FallbackResult>,
) {
    if !data_source.allow_overlapping_tiles() || max_down == 0 {
        return;
    }
    descend(cache, data_source, tiling_scheme, tile_key, offset, 1, max_down, out);
}

fn descend(
    cache: &mut TileCache,
    data_source: &dyn DataSource,
    tiling_scheme: &dyn TilingScheme,
    tile_key: &TileKey,
    offset: TileOffset,
    depth: u32,
    max_down: u32,
    out: &mut Vec<FallbackResult>,
) {
    if depth > max_down {
        return;
    }
    for child in tiling_scheme.get_sub_tile_keys(tile_key) {
        if child.level > data_source.max_data_level() {
            continue;
        }
        let cache_key = CacheKey::new(data_source.name(), &child, offset);
        if let Some(tile) = cache.get(&cache_key) {
            if tile.borrow().is_ready() {
                out.push(FallbackResult { tile: tile.clone(), level_offset: depth as i32 });
            }
        }
        descend(cache, data_source, tiling_scheme, &child, offset, depth + 1, max_down, out);
    }
}
