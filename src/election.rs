//! Election Pipeline (§4.3): the heart of `update_render_list`. Buckets
//! datasources, intersects the frustum, sorts and caps each datasource's
//! candidate list, resolves tiles, applies overlap suppression and frame
//! admission, pulls in dependencies, populates rendered tiles via
//! fallback, and runs cache maintenance and clip-plane evaluation.
//!
//! Grounded on the teacher's `scheduler::prefetch_for_viewport` (bucket →
//! compute candidates → filter → cap → dispatch shape), generalized from
//! its 2D viewport to a 3D frustum per-datasource.

use std::collections::HashMap;

use crate::cache::TileCache;
use crate::datasource::{DataSource, DataSourceTileList};
use crate::diag::Diagnostics;
use crate::fallback::{self, AncestorMemo};
use crate::frustum::{self, Camera, ClipPlanesEvaluator, ElevationRangeSource, IntersectedTile, ProjectionType, ViewRanges};
use crate::key::{CompositeTileId, TileKey};
use crate::lifecycle::{self, TaskQueue};
use crate::tile::TileHandle;
use crate::VisibleTileSetOptions;

/// Relative tolerance for the "near-tie" distance comparison in the sort
/// step: `|a - b| < (a + b) * EPSILON` falls back to morton order.
const DISTANCE_TIE_EPSILON: f64 = 1e-6;

pub struct ElectionResult {
    pub tile_lists: HashMap<String, DataSourceTileList>,
    pub view_ranges: ViewRanges,
    pub view_ranges_changed: bool,
    /// `true` if another `update_render_list` should be requested before
    /// the next real frame (delayed tiles, or a non-final elevation range).
    pub request_update: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn update_render_list(
    cache: &mut TileCache,
    task_queue: &mut dyn TaskQueue,
    diagnostics: &dyn Diagnostics,
    data_sources: &[&dyn DataSource],
    camera: &Camera,
    options: &VisibleTileSetOptions,
    storage_level: u32,
    camera_zoom: u32,
    frame_number: i64,
    elevation_range_source: Option<&dyn ElevationRangeSource>,
    previous_view_ranges: ViewRanges,
    clip_planes_evaluator: &dyn ClipPlanesEvaluator,
) -> ElectionResult {
    let mut tile_lists: HashMap<String, DataSourceTileList> = HashMap::new();
    let mut overlap_map: HashMap<CompositeTileId, (TileHandle, bool)> = HashMap::new();
    let mut admission = FrameAdmission::new(options.max_tiles_per_frame);
    let mut all_bounding_boxes_final = true;
    let mut request_update = false;

    // Steps 1-7: per-datasource frustum intersection, sort, cap, resolve.
    for data_source in data_sources {
        let zoom_level = data_source.get_data_zoom_level(camera_zoom);
        let scheme = data_source.tiling_scheme();

        let intersection = frustum::intersect_frustum(
            camera,
            scheme,
            &[zoom_level],
            &[0],
            scheme.world_size(),
            elevation_range_source,
            options.extended_frustum_culling,
        );
        all_bounding_boxes_final &= intersection.all_bounding_boxes_final;

        let mut entries = intersection.tiles;
        sort_by_distance_then_morton(&mut entries);
        entries.truncate(options.max_visible_data_source_tiles);

        let mut list = DataSourceTileList::new(zoom_level, storage_level);
        let mut visible_mortons: Vec<u64> = Vec::new();

        for entry in &entries {
            let tile = match lifecycle::get_tile(cache, task_queue, *data_source, entry.tile_key, entry.offset, frame_number) {
                Some(tile) => tile,
                None => continue, // NoTileAvailable: not an error, just skip.
            };

            visible_mortons.push(entry.tile_key.morton_code());
            apply_entry_to_tile(&tile, entry);

            let loaded = tile.borrow().all_geometry_loaded();
            list.all_visible_tile_loaded &= loaded;
            if !loaded {
                list.num_tiles_loading += 1;
            }

            if loaded {
                if data_source.is_fully_covering() {
                    apply_overlap_suppression(&mut overlap_map, &tile, data_source.is_background(), scheme.projection());
                }
                admission.admit(&tile, frame_number);
            }

            list.visible_tiles.push(tile);
        }

        // Step 8: dependency pass, one wave, no recursion.
        let dependency_keys: Vec<TileKey> = list
            .visible_tiles
            .iter()
            .flat_map(|tile| tile.borrow().dependencies().to_vec())
            .filter(|key| !visible_mortons.contains(&key.morton_code()))
            .collect();

        for dependency_key in dependency_keys {
            if let Some(tile) = lifecycle::get_tile(cache, task_queue, *data_source, dependency_key, 0, frame_number) {
                admission.admit(&tile, frame_number);
                list.visible_tiles.push(tile);
            }
        }

        // Step 9: rendered-tile population (ready tiles directly, fallback
        // search for the rest).
        let mut memo = AncestorMemo::new();
        for tile in list.visible_tiles.clone() {
            let (unique_key, ready) = {
                let t = tile.borrow();
                (t.unique_key, t.is_ready())
            };

            if ready {
                list.rendered_tiles.insert(unique_key, tile.clone());
                continue;
            }

            let tile_key = tile.borrow().tile_key;
            let offset = tile.borrow().offset;

            if let Some(result) = fallback::search_ancestor(
                cache,
                *data_source,
                &tile_key,
                offset,
                options.quad_tree_search_distance_up,
                &mut memo,
            ) {
                result.tile.borrow_mut().level_offset = result.level_offset;
                list.rendered_tiles.insert(unique_key, result.tile);
            }

            let mut descendants = Vec::new();
            fallback::search_descendants(
                cache,
                *data_source,
                scheme,
                &tile_key,
                offset,
                options.quad_tree_search_distance_down,
                &mut descendants,
            );
            for descendant in descendants {
                descendant.tile.borrow_mut().level_offset = descendant.level_offset;
                list.rendered_tiles.insert(descendant.tile.borrow().unique_key, descendant.tile.clone());
            }
        }

        // Step 10: cache maintenance for this datasource.
        let stale_keys: Vec<_> = {
            let mut keys = Vec::new();
            cache.for_each(Some(data_source.name()), |key, tile| {
                let t = tile.borrow();
                if !t.is_visible && !t.all_geometry_loaded() {
                    keys.push(key.clone());
                }
            });
            keys
        };
        for key in stale_keys {
            if let Some(tile) = cache.delete(&key) {
                tile.borrow_mut().dispose();
            }
        }

        tile_lists.insert(data_source.name().to_string(), list);
    }

    cache.shrink_to_capacity();
    cache.drain_pending_dispose();

    // Step 11: clip-plane update across every datasource's rendered tiles.
    let mut min_altitude = f64::INFINITY;
    let mut max_altitude = f64::NEG_INFINITY;
    for list in tile_lists.values() {
        for tile in list.rendered_tiles.values() {
            let geo_box = tile.borrow().geo_box();
            min_altitude = min_altitude.min(geo_box.min_altitude);
            max_altitude = max_altitude.max(geo_box.max_altitude);
        }
    }
    if !min_altitude.is_finite() {
        min_altitude = 0.0;
        max_altitude = 0.0;
    }

    let view_ranges = clip_planes_evaluator.evaluate_clip_planes(min_altitude, max_altitude);
    let view_ranges_changed = view_ranges != previous_view_ranges;

    if admission.request_update || !all_bounding_boxes_final {
        request_update = true;
    }

    diagnostics.info(&format!(
        "update_render_list: frame {frame_number}, {} datasource(s), view_ranges_changed={view_ranges_changed}",
        tile_lists.len()
    ));

    ElectionResult { tile_lists, view_ranges, view_ranges_changed, request_update }
}

fn apply_entry_to_tile(tile: &TileHandle, entry: &IntersectedTile) {
    let mut t = tile.borrow_mut();
    t.visible_area = entry.area;
    t.elevation_range.min_elevation = entry.elevation_range.min_elevation;
    t.elevation_range.max_elevation = entry.elevation_range.max_elevation;
    t.is_visible = true;
    t.level_offset = 0;
}

/// Sorts by `distance` ascending; near-ties (within a relative epsilon of
/// `1e-6`) fall back to morton order so label placement doesn't flicker
/// between frames.
fn sort_by_distance_then_morton(entries: &mut [IntersectedTile]) {
    entries.sort_by(|a, b| {
        let tie = (a.distance - b.distance).abs() < (a.distance + b.distance) * DISTANCE_TIE_EPSILON;
        if tie {
            a.tile_key.morton_code().cmp(&b.tile_key.morton_code())
        } else {
            a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Per-frame map of "the tile already covering this key", keyed by
/// `unique_key`. Fully-covering datasources only (§4.4).
fn apply_overlap_suppression(
    overlap_map: &mut HashMap<CompositeTileId, (TileHandle, bool)>,
    tile: &TileHandle,
    is_background: bool,
    projection_type: ProjectionType,
) {
    tile.borrow_mut().skip_rendering = false;
    if projection_type == ProjectionType::Spherical {
        return;
    }

    let unique_key = tile.borrow().unique_key;
    match overlap_map.get(&unique_key).cloned() {
        None => {
            overlap_map.insert(unique_key, (tile.clone(), is_background));
        }
        Some((incumbent, incumbent_is_background)) => {
            if incumbent_is_background {
                incumbent.borrow_mut().skip_rendering = true;
                overlap_map.insert(unique_key, (tile.clone(), is_background));
            } else {
                tile.borrow_mut().skip_rendering = true;
            }
        }
    }
}

/// Bounds how many newly-visible tiles may upload in one frame (§4.5).
struct FrameAdmission {
    bound: Option<usize>,
    count: usize,
    request_update: bool,
}

impl FrameAdmission {
    fn new(max_tiles_per_frame: usize) -> Self {
        FrameAdmission {
            bound: if max_tiles_per_frame == 0 { None } else { Some(max_tiles_per_frame) },
            count: 0,
            request_update: false,
        }
    }

    fn admit(&mut self, tile: &TileHandle, frame_number: i64) {
        let mut t = tile.borrow_mut();
        if !t.is_new() {
            t.frame_num_last_visible = frame_number;
            return;
        }
        match self.bound {
            None => {
                t.delay_rendering = false;
                t.frame_num_visible = frame_number;
                t.num_frames_visible += 1;
            }
            Some(bound) => {
                // Continuity exception (§4.5): a tile already visible last
                // frame is exempt from the cap, so it doesn't flicker out
                // while still under budget consideration.
                let was_visible_last_frame = t.frame_num_last_visible == frame_number - 1;
                if self.count >= bound && !was_visible_last_frame {
                    t.delay_rendering = true;
                    self.request_update = true;
                } else {
                    t.delay_rendering = false;
                    t.frame_num_visible = frame_number;
                    t.num_frames_visible += 1;
                    self.count += 1;
                }
            }
        }
        t.frame_num_last_visible = frame_number;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResourceComputationType;
    use crate::frustum::{fixtures::PlanarTilingScheme, AABB, TilingScheme};
    use crate::lifecycle::ImmediateTaskQueue;
    use crate::tile::{ElevationRange, GeoBox, TilePayload};
    use glam::{Mat4, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct CountingPayload {
        loaded: bool,
    }

    impl TilePayload for CountingPayload {
        fn memory_usage(&self) -> u64 {
            1
        }
        fn has_geometry(&self) -> bool {
            self.loaded
        }
        fn all_geometry_loaded(&self) -> bool {
            self.loaded
        }
        fn load(&mut self) {
            self.loaded = true;
        }
        fn dispose(&mut self) {}
    }

    #[derive(Debug)]
    struct SimpleDataSource {
        name: String,
        scheme: PlanarTilingScheme,
        fully_covering: bool,
        background: bool,
    }

    impl DataSource for SimpleDataSource {
        fn name(&self) -> &str {
            &self.name
        }
        fn cacheable(&self) -> bool {
            true
        }
        fn min_data_level(&self) -> u32 {
            0
        }
        fn max_data_level(&self) -> u32 {
            10
        }
        fn get_data_zoom_level(&self, camera_zoom: u32) -> u32 {
            camera_zoom
        }
        fn tiling_scheme(&self) -> &dyn TilingScheme {
            &self.scheme
        }
        fn get_tile(&self, tile_key: TileKey, _touch: bool) -> Option<TileHandle> {
            let payload = CountingPayload { loaded: true };
            Some(Rc::new(RefCell::new(crate::tile::Tile::new(tile_key, 0, self.name.clone(), Box::new(payload)))))
        }
        fn is_fully_covering(&self) -> bool {
            self.fully_covering
        }
        fn is_background(&self) -> bool {
            self.background
        }
    }

    struct NullClipPlanes;
    impl std::fmt::Debug for NullClipPlanes {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "NullClipPlanes")
        }
    }
    impl ClipPlanesEvaluator for NullClipPlanes {
        fn evaluate_clip_planes(&self, min_altitude: f64, max_altitude: f64) -> ViewRanges {
            ViewRanges { near: 0.1, far: 10000.0, minimum: min_altitude, maximum: max_altitude }
        }
    }

    fn camera() -> Camera {
        Camera {
            position: Vec3::new(0.0, 500.0, 0.0),
            view: Mat4::look_at_rh(Vec3::new(0.0, 500.0, 0.0), Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)),
            fov_y_radians: std::f32::consts::FRAC_PI_3,
            aspect_ratio: 1.0,
            near: 0.1,
            far: 2000.0,
        }
    }

    fn options(max_visible: usize, max_per_frame: usize) -> VisibleTileSetOptions {
        VisibleTileSetOptions {
            max_visible_data_source_tiles: max_visible,
            max_tiles_per_frame: max_per_frame,
            quad_tree_search_distance_up: 2,
            quad_tree_search_distance_down: 2,
            extended_frustum_culling: false,
            ..Default::default()
        }
    }

    #[test]
    fn s4_per_frame_admission_caps_uploads() {
        let mut cache = TileCache::new(1000.0, ResourceComputationType::NumberOfTiles);
        let mut queue = ImmediateTaskQueue::default();
        let diag = crate::diag::LogDiagnostics;
        let scheme = PlanarTilingScheme { world_size: 1000.0 };
        let source = SimpleDataSource { name: "base".into(), scheme, fully_covering: false, background: false };
        let opts = options(16, 2);

        let result = update_render_list(
            &mut cache,
            &mut queue,
            &diag,
            &[&source as &dyn DataSource],
            &camera(),
            &opts,
            3,
            3,
            10,
            None,
            ViewRanges::default(),
            &NullClipPlanes,
        );

        let list = &result.tile_lists["base"];
        let admitted = list.visible_tiles.iter().filter(|t| !t.borrow().delay_rendering).count();
        let delayed = list.visible_tiles.iter().filter(|t| t.borrow().delay_rendering).count();
        assert_eq!(admitted, 2);
        assert_eq!(delayed, list.visible_tiles.len() - 2);
        assert!(result.request_update);
        for tile in list.visible_tiles.iter().filter(|t| !t.borrow().delay_rendering) {
            assert_eq!(tile.borrow().frame_num_visible, 10);
        }
    }

    #[test]
    fn frame_admission_continuity_exempts_previously_delayed_tile() {
        // Three tiles at the same distance (so sort order is morton-only
        // and stable across frames), bound to 1 admission per frame.
        #[derive(Debug)]
        struct ThreeTileScheme;
        impl TilingScheme for ThreeTileScheme {
            fn root_keys(&self) -> Vec<TileKey> {
                vec![TileKey::new(1, 0, 0), TileKey::new(1, 0, 1), TileKey::new(1, 1, 0)]
            }
            fn tile_bounds(&self, _tile_key: &TileKey) -> AABB {
                AABB::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(10.0, 0.0, 10.0))
            }
            fn projection(&self) -> ProjectionType {
                ProjectionType::Planar
            }
        }

        #[derive(Debug)]
        struct ThreeTileDataSource {
            scheme: ThreeTileScheme,
        }
        impl DataSource for ThreeTileDataSource {
            fn name(&self) -> &str {
                "base"
            }
            fn cacheable(&self) -> bool {
                true
            }
            fn min_data_level(&self) -> u32 {
                0
            }
            fn max_data_level(&self) -> u32 {
                10
            }
            fn get_data_zoom_level(&self, _camera_zoom: u32) -> u32 {
                1
            }
            fn tiling_scheme(&self) -> &dyn TilingScheme {
                &self.scheme
            }
            fn get_tile(&self, tile_key: TileKey, _touch: bool) -> Option<TileHandle> {
                let payload = CountingPayload { loaded: true };
                Some(Rc::new(RefCell::new(crate::tile::Tile::new(tile_key, 0, "base", Box::new(payload)))))
            }
            fn is_fully_covering(&self) -> bool {
                false
            }
            fn is_background(&self) -> bool {
                false
            }
        }

        let mut cache = TileCache::new(1000.0, ResourceComputationType::NumberOfTiles);
        let mut queue = ImmediateTaskQueue::default();
        let diag = crate::diag::LogDiagnostics;
        let source = ThreeTileDataSource { scheme: ThreeTileScheme };
        let opts = options(16, 1);

        let run = |cache: &mut TileCache, queue: &mut ImmediateTaskQueue, frame_number: i64| {
            update_render_list(
                cache,
                queue,
                &diag,
                &[&source as &dyn DataSource],
                &camera(),
                &opts,
                0,
                0,
                frame_number,
                None,
                ViewRanges::default(),
                &NullClipPlanes,
            )
        };

        // Frame 1: lowest-morton tile (1,0,0) gets the one admission slot;
        // (1,0,1) and (1,1,0) are delayed.
        let frame1 = run(&mut cache, &mut queue, 1);
        let list1 = &frame1.tile_lists["base"];
        assert_eq!(list1.visible_tiles.len(), 3);
        let third_tile_frame1 = list1.visible_tiles.iter().find(|t| t.borrow().tile_key == TileKey::new(1, 1, 0)).unwrap();
        assert!(third_tile_frame1.borrow().delay_rendering);

        // Frame 2: the same tile handle was already delayed (elected but
        // not admitted) last frame, so it's exempt from the cap even
        // though frame 2's single slot goes to (1,0,1) first.
        let frame2 = run(&mut cache, &mut queue, 2);
        let list2 = &frame2.tile_lists["base"];
        let third_tile_frame2 = list2.visible_tiles.iter().find(|t| t.borrow().tile_key == TileKey::new(1, 1, 0)).unwrap();
        assert!(!third_tile_frame2.borrow().delay_rendering, "previously-delayed tile must be exempt from the cap once it was part of last frame's visible set");
    }

    #[test]
    fn unloaded_tile_is_not_admitted_or_overlap_suppressed() {
        let mut cache = TileCache::new(1000.0, ResourceComputationType::NumberOfTiles);
        let mut queue = ImmediateTaskQueue::default();
        let diag = crate::diag::LogDiagnostics;
        let scheme = PlanarTilingScheme { world_size: 1000.0 };
        let source = SimpleDataSource { name: "base".into(), scheme, fully_covering: true, background: false };
        let opts = options(1, 0);

        // Override get_tile to return an unloaded tile via a local type.
        #[derive(Debug)]
        struct UnloadedDataSource(SimpleDataSource);
        impl DataSource for UnloadedDataSource {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn cacheable(&self) -> bool {
                self.0.cacheable()
            }
            fn min_data_level(&self) -> u32 {
                self.0.min_data_level()
            }
            fn max_data_level(&self) -> u32 {
                self.0.max_data_level()
            }
            fn get_data_zoom_level(&self, camera_zoom: u32) -> u32 {
                self.0.get_data_zoom_level(camera_zoom)
            }
            fn tiling_scheme(&self) -> &dyn TilingScheme {
                self.0.tiling_scheme()
            }
            fn get_tile(&self, tile_key: TileKey, _touch: bool) -> Option<TileHandle> {
                let payload = CountingPayload { loaded: false };
                Some(Rc::new(RefCell::new(crate::tile::Tile::new(tile_key, 0, self.0.name().to_string(), Box::new(payload)))))
            }
            fn is_fully_covering(&self) -> bool {
                self.0.is_fully_covering()
            }
            fn is_background(&self) -> bool {
                self.0.is_background()
            }
        }
        let source = UnloadedDataSource(source);

        let result = update_render_list(
            &mut cache,
            &mut queue,
            &diag,
            &[&source as &dyn DataSource],
            &camera(),
            &opts,
            0,
            0,
            1,
            None,
            ViewRanges::default(),
            &NullClipPlanes,
        );

        let list = &result.tile_lists["base"];
        assert!(!list.visible_tiles.is_empty());
        for tile in &list.visible_tiles {
            let t = tile.borrow();
            assert!(t.is_new(), "unloaded tile must not consume an admission slot");
            assert!(!t.skip_rendering, "unloaded tile must not become an overlap-suppression incumbent");
        }
        assert_eq!(list.num_tiles_loading, list.visible_tiles.len() as u32);
    }

    #[test]
    fn s3_overlap_suppression_prefers_non_background() {
        let mut overlap_map: HashMap<CompositeTileId, (TileHandle, bool)> = HashMap::new();
        let payload_a = CountingPayload { loaded: true };
        let payload_b = CountingPayload { loaded: true };
        let background = Rc::new(RefCell::new(crate::tile::Tile::new(TileKey::root(), 0, "bg", Box::new(payload_a))));
        let vector = Rc::new(RefCell::new(crate::tile::Tile::new(TileKey::root(), 0, "vector", Box::new(payload_b))));

        apply_overlap_suppression(&mut overlap_map, &background, true, ProjectionType::Planar);
        apply_overlap_suppression(&mut overlap_map, &vector, false, ProjectionType::Planar);

        assert!(background.borrow().skip_rendering);
        assert!(!vector.borrow().skip_rendering);
    }

    #[test]
    fn s3_overlap_suppression_disabled_on_spherical_projection() {
        let mut overlap_map: HashMap<CompositeTileId, (TileHandle, bool)> = HashMap::new();
        let payload_a = CountingPayload { loaded: true };
        let payload_b = CountingPayload { loaded: true };
        let background = Rc::new(RefCell::new(crate::tile::Tile::new(TileKey::root(), 0, "bg", Box::new(payload_a))));
        let vector = Rc::new(RefCell::new(crate::tile::Tile::new(TileKey::root(), 0, "vector", Box::new(payload_b))));

        apply_overlap_suppression(&mut overlap_map, &background, true, ProjectionType::Spherical);
        apply_overlap_suppression(&mut overlap_map, &vector, false, ProjectionType::Spherical);

        assert!(!background.borrow().skip_rendering);
        assert!(!vector.borrow().skip_rendering);
    }

    #[test]
    fn s1_sort_is_stable_by_morton_on_near_ties() {
        // Two level-1 siblings: (1,1,1) has a strictly greater morton code
        // than (1,0,0) by construction (interleaving puts higher row/column
        // bits later in the code).
        let lower = TileKey::new(1, 0, 0);
        let higher = TileKey::new(1, 1, 1);
        assert!(lower.morton_code() < higher.morton_code());

        let mut entries = vec![
            IntersectedTile { tile_key: higher, offset: 0, area: 1.0, distance: 1000.0005, elevation_range: Default::default() },
            IntersectedTile { tile_key: lower, offset: 0, area: 1.0, distance: 1000.0, elevation_range: Default::default() },
        ];
        sort_by_distance_then_morton(&mut entries);
        assert_eq!(entries[0].tile_key, lower);
        assert_eq!(entries[1].tile_key, higher);

        let mut far_apart = entries.clone();
        far_apart[0].distance = 1000.1;
        far_apart[1].distance = 1000.0;
        sort_by_distance_then_morton(&mut far_apart);
        approx::assert_relative_eq!(far_apart[0].distance, 1000.0);
        approx::assert_relative_eq!(far_apart[1].distance, 1000.1);
    }

    #[test]
    fn s6_dependency_pulled_in_exactly_once() {
        #[derive(Debug)]
        struct DependencyPayload {
            dependencies: Vec<TileKey>,
        }
        impl TilePayload for DependencyPayload {
            fn memory_usage(&self) -> u64 {
                1
            }
            fn has_geometry(&self) -> bool {
                true
            }
            fn all_geometry_loaded(&self) -> bool {
                true
            }
            fn dependencies(&self) -> &[TileKey] {
                &self.dependencies
            }
            fn load(&mut self) {}
            fn dispose(&mut self) {}
        }

        #[derive(Debug)]
        struct DependencyDataSource {
            scheme: PlanarTilingScheme,
            dependency_key: TileKey,
        }
        impl DataSource for DependencyDataSource {
            fn name(&self) -> &str {
                "deps"
            }
            fn cacheable(&self) -> bool {
                true
            }
            fn min_data_level(&self) -> u32 {
                0
            }
            fn max_data_level(&self) -> u32 {
                10
            }
            fn get_data_zoom_level(&self, camera_zoom: u32) -> u32 {
                camera_zoom
            }
            fn tiling_scheme(&self) -> &dyn TilingScheme {
                &self.scheme
            }
            fn get_tile(&self, tile_key: TileKey, _touch: bool) -> Option<TileHandle> {
                let dependencies = if tile_key == TileKey::root() { vec![self.dependency_key] } else { vec![] };
                let payload = DependencyPayload { dependencies };
                Some(Rc::new(RefCell::new(crate::tile::Tile::new(tile_key, 0, "deps", Box::new(payload)))))
            }
        }

        let mut cache = TileCache::new(1000.0, ResourceComputationType::NumberOfTiles);
        let mut queue = ImmediateTaskQueue::default();
        let diag = crate::diag::LogDiagnostics;
        let dependency_key = TileKey::new(4, 9, 9);
        let source = DependencyDataSource { scheme: PlanarTilingScheme { world_size: 1000.0 }, dependency_key };
        let opts = options(16, 0);

        let result = update_render_list(
            &mut cache,
            &mut queue,
            &diag,
            &[&source as &dyn DataSource],
            &camera(),
            &opts,
            0,
            0,
            1,
            None,
            ViewRanges::default(),
            &NullClipPlanes,
        );

        let list = &result.tile_lists["deps"];
        let matches = list.visible_tiles.iter().filter(|t| t.borrow().tile_key == dependency_key).count();
        assert_eq!(matches, 1);
        let dependency_tile = list.visible_tiles.iter().find(|t| t.borrow().tile_key == dependency_key).unwrap();
        assert_eq!(dependency_tile.borrow().offset, 0);
    }

    #[test]
    fn unused_import_guard() {
        let _ = AABB::new(Vec3::ZERO, Vec3::ONE);
        let _: ElevationRange = Default::default();
        let _: GeoBox = Default::default();
    }
}
