//! Visible Tile Set core: the renderer bookkeeping brain that selects,
//! caches, and substitutes quad-tree map tiles every frame.
//!
//! ```ignore
//! let mut vts = VisibleTileSet::new(VisibleTileSetOptions::default());
//! let (view_ranges, changed) = vts.update_render_list(&[&my_data_source], &camera, 0, 0, None);
//! vts.for_each_visible_tile("terrain", |tile| { /* draw tile */ });
//! ```
//!
//! The five cooperating components (Tile Cache, Frustum Intersector,
//! Election Pipeline, Fallback Searcher, Lifecycle & Task Queue) live in
//! their own modules; this file is only the façade a renderer embeds.

mod cache;
mod datasource;
mod diag;
mod election;
mod error;
mod fallback;
mod frustum;
mod key;
mod lifecycle;
mod tile;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use cache::{CacheStats, ResourceComputationType, TileCache};
pub use datasource::{DataSource, DataSourceTileList};
pub use diag::{Diagnostics, LogDiagnostics};
pub use election::ElectionResult;
pub use error::{VtsError, VtsResult};
pub use fallback::FallbackResult;
pub use frustum::{
    Camera, ClipPlanesEvaluator, ElevationRangeResult, ElevationRangeSource, Frustum,
    IntersectedTile, Plane, Projection, ProjectionType, TilingScheme, ViewRanges, AABB,
};
pub use key::{CacheKey, CompositeTileId, TileKey, TileOffset};
pub use lifecycle::{ImmediateTaskQueue, LoadTask, TaskGroup, TaskQueue};
pub use tile::{ElevationRange, GeoBox, Tile, TileHandle, TileLoader, TilePayload};

/// Tunable knobs for one [`VisibleTileSet`], per the external-interfaces
/// section: cache size/accounting mode, per-frame election caps, fallback
/// search depth, and whether extended-frustum culling is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibleTileSetOptions {
    /// In MB or entry count, depending on `resource_computation_type`.
    pub tile_cache_size: f64,
    pub resource_computation_type: ResourceComputationType,
    pub max_visible_data_source_tiles: usize,
    /// `0` disables the bound entirely (every tile uploads).
    pub max_tiles_per_frame: usize,
    pub quad_tree_search_distance_up: u32,
    pub quad_tree_search_distance_down: u32,
    pub extended_frustum_culling: bool,
}

impl Default for VisibleTileSetOptions {
    fn default() -> Self {
        VisibleTileSetOptions {
            tile_cache_size: 4096.0,
            resource_computation_type: ResourceComputationType::EstimationInMb,
            max_visible_data_source_tiles: 256,
            max_tiles_per_frame: 3,
            quad_tree_search_distance_up: 3,
            quad_tree_search_distance_down: 3,
            extended_frustum_culling: false,
        }
    }
}

/// A clip-planes evaluator that derives near/far from the elevation span
/// alone. Adequate when the renderer doesn't supply its own.
#[derive(Debug, Default, Clone, Copy)]
struct DefaultClipPlanesEvaluator;

impl ClipPlanesEvaluator for DefaultClipPlanesEvaluator {
    fn evaluate_clip_planes(&self, min_altitude: f64, max_altitude: f64) -> ViewRanges {
        let span = (max_altitude - min_altitude).abs();
        ViewRanges { near: 0.1, far: span * 4.0 + span.max(1.0), minimum: min_altitude, maximum: max_altitude }
    }
}

/// The per-renderer entry point. Owns the tile cache and the previous
/// frame's per-datasource tile lists; everything else (datasources,
/// camera, task queue, diagnostics) is supplied by the embedder.
pub struct VisibleTileSet {
    options: VisibleTileSetOptions,
    cache: TileCache,
    task_queue: Box<dyn TaskQueue>,
    diagnostics: Box<dyn Diagnostics>,
    clip_planes_evaluator: Box<dyn ClipPlanesEvaluator>,
    frame_number: i64,
    view_ranges: ViewRanges,
    tile_lists: HashMap<String, DataSourceTileList>,
}

impl std::fmt::Debug for VisibleTileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibleTileSet")
            .field("options", &self.options)
            .field("frame_number", &self.frame_number)
            .field("view_ranges", &self.view_ranges)
            .finish_non_exhaustive()
    }
}

impl VisibleTileSet {
    /// Builds a set with the `log`-backed diagnostics sink, a synchronous
    /// task queue, and an elevation-only clip-planes evaluator. Good enough
    /// for a renderer with no worker pool or camera-aware evaluator yet.
    pub fn new(options: VisibleTileSetOptions) -> Self {
        Self::with_collaborators(
            options,
            Box::new(ImmediateTaskQueue::default()),
            Box::new(LogDiagnostics),
            Box::new(DefaultClipPlanesEvaluator),
        )
    }

    pub fn with_collaborators(
        options: VisibleTileSetOptions,
        task_queue: Box<dyn TaskQueue>,
        diagnostics: Box<dyn Diagnostics>,
        clip_planes_evaluator: Box<dyn ClipPlanesEvaluator>,
    ) -> Self {
        let cache = TileCache::new(options.tile_cache_size, options.resource_computation_type);
        VisibleTileSet {
            options,
            cache,
            task_queue,
            diagnostics,
            clip_planes_evaluator,
            frame_number: 0,
            view_ranges: ViewRanges::default(),
            tile_lists: HashMap::new(),
        }
    }

    /// Runs one frame of the election pipeline. Returns the updated clip
    /// `ViewRanges` and whether they changed from the previous frame.
    pub fn update_render_list(
        &mut self,
        data_sources: &[&dyn DataSource],
        camera: &Camera,
        storage_level: u32,
        camera_zoom: u32,
        elevation_range_source: Option<&dyn ElevationRangeSource>,
    ) -> (ViewRanges, bool) {
        self.frame_number += 1;
        let result = election::update_render_list(
            &mut self.cache,
            self.task_queue.as_mut(),
            self.diagnostics.as_ref(),
            data_sources,
            camera,
            &self.options,
            storage_level,
            camera_zoom,
            self.frame_number,
            elevation_range_source,
            self.view_ranges,
            self.clip_planes_evaluator.as_ref(),
        );
        self.view_ranges = result.view_ranges;
        self.tile_lists = result.tile_lists;
        (self.view_ranges, result.view_ranges_changed)
    }

    pub fn get_tile(&mut self, data_source: &dyn DataSource, tile_key: TileKey, offset: TileOffset) -> Option<TileHandle> {
        lifecycle::get_tile(&mut self.cache, self.task_queue.as_mut(), data_source, tile_key, offset, self.frame_number)
    }

    /// Cache-only lookup; never creates, schedules, or touches.
    pub fn get_cached_tile(&mut self, data_source: &dyn DataSource, tile_key: &TileKey, offset: TileOffset) -> Option<TileHandle> {
        lifecycle::get_cached_tile(&mut self.cache, data_source, tile_key, offset)
    }

    pub fn get_rendered_tile(&self, data_source_name: &str, unique_key: CompositeTileId) -> Option<TileHandle> {
        self.tile_lists.get(data_source_name)?.rendered_tiles.get(&unique_key).cloned()
    }

    /// Walks `tile_key` up toward the root, returning the first rendered
    /// substitute found — the exact tile if it rendered, otherwise whatever
    /// ancestor fallback covers it this frame.
    pub fn get_rendered_tile_at_location(&self, data_source_name: &str, tile_key: &TileKey, offset: TileOffset) -> Option<TileHandle> {
        let list = self.tile_lists.get(data_source_name)?;
        let mut current = *tile_key;
        loop {
            let id = CompositeTileId::for_key_and_offset(&current, offset);
            if let Some(tile) = list.rendered_tiles.get(&id) {
                return Some(tile.clone());
            }
            current = current.parent()?;
        }
    }

    /// Evicts every entry of `data_source` (or the whole cache, if `None`),
    /// bypassing `can_evict`, and drains the dispose queue immediately.
    pub fn clear_tile_cache(&mut self, data_source: Option<&dyn DataSource>) {
        match data_source {
            Some(ds) => self.cache.evict_selected(|tile| tile.borrow().data_source_name == ds.name()),
            None => self.cache.evict_all(),
        }
        self.cache.drain_pending_dispose();
    }

    /// `data_source = None` targets every datasource; `filter = None` keeps
    /// every visible/rendered tile of the target datasource(s).
    pub fn mark_tiles_dirty(&mut self, data_source: Option<&dyn DataSource>, filter: Option<&dyn Fn(&TileHandle) -> bool>) {
        let tiles: Vec<TileHandle> = match data_source {
            Some(ds) => match self.tile_lists.get(ds.name()) {
                Some(list) => list.visible_tiles.iter().cloned().chain(list.rendered_tiles.values().cloned()).collect(),
                None => Vec::new(),
            },
            None => self
                .tile_lists
                .values()
                .flat_map(|list| list.visible_tiles.iter().cloned().chain(list.rendered_tiles.values().cloned()))
                .collect(),
        };
        lifecycle::mark_tiles_dirty(&mut self.cache, self.task_queue.as_mut(), data_source, tiles, filter);
    }

    pub fn remove_data_source(&mut self, data_source: &dyn DataSource) {
        self.cache.evict_selected(|tile| tile.borrow().data_source_name == data_source.name());
        self.cache.drain_pending_dispose();
        self.tile_lists.remove(data_source.name());
    }

    pub fn for_each_visible_tile(&self, data_source_name: &str, mut callback: impl FnMut(&TileHandle)) {
        if let Some(list) = self.tile_lists.get(data_source_name) {
            for tile in &list.visible_tiles {
                callback(tile);
            }
        }
    }

    pub fn for_each_cached_tile(&self, data_source_name: Option<&str>, callback: impl FnMut(&CacheKey, &TileHandle)) {
        self.cache.for_each(data_source_name, callback);
    }

    pub fn dispose_pending_tiles(&mut self) {
        lifecycle::dispose_pending_tiles(&mut self.cache);
    }

    pub fn resource_computation_type(&self) -> ResourceComputationType {
        self.cache.mode()
    }

    pub fn set_resource_computation_type(&mut self, mode: ResourceComputationType) {
        self.options.resource_computation_type = mode;
        self.cache.set_capacity(self.cache.capacity(), mode);
    }

    pub fn max_tiles_per_frame(&self) -> usize {
        self.options.max_tiles_per_frame
    }

    /// Fails with `VtsError::InvalidConfiguration` on a negative value.
    pub fn set_max_tiles_per_frame(&mut self, value: i64) -> VtsResult<()> {
        if value < 0 {
            return Err(VtsError::InvalidConfiguration(format!("max_tiles_per_frame must be >= 0, got {value}")));
        }
        self.options.max_tiles_per_frame = value as usize;
        Ok(())
    }

    pub fn view_ranges(&self) -> ViewRanges {
        self.view_ranges
    }
}
