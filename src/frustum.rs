//! Frustum Intersector: given a camera, a tiling scheme, and a list of
//! target zoom levels, finds the tile keys the camera frustum touches.
//!
//! Grounded on `meridian-map-engine`'s `camera::projection` module for the
//! glam-based geometry (the teacher crate has no 3D math of its own, only
//! 2D pixel-rect math in `prefetch.rs`); the overall "view rect/frustum in,
//! candidate tile list out" shape follows the teacher's
//! `PrefetchCalculator`.

use glam::{Mat4, Vec3};

use crate::key::TileKey;

/// Map projection type. Spherical globes skip overlap suppression (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Planar,
    Spherical,
}

/// Converts between world-space points and geographic tile space.
pub trait Projection: std::fmt::Debug {
    fn projection_type(&self) -> ProjectionType;

    /// Projects a geographic point into world space.
    fn project_point(&self, longitude: f64, latitude: f64, altitude: f64) -> Vec3;

    /// World-space size of one unit of the tiling scheme's root tile, used
    /// to translate tile bounds across wrap-around offsets.
    fn world_size(&self) -> f64;
}

/// An axis-aligned world-space box: a tile's footprint, or a frustum's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        AABB { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn translated_x(&self, dx: f32) -> AABB {
        AABB::new(self.min + Vec3::new(dx, 0.0, 0.0), self.max + Vec3::new(dx, 0.0, 0.0))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    pub fn from_points(points: &[Vec3]) -> AABB {
        let mut min = points[0];
        let mut max = points[0];
        for &p in &points[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        AABB::new(min, max)
    }

    /// Standard two-box overlap test, used for extended frustum culling.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Maps quad-tree tile keys onto world-space geometry.
pub trait TilingScheme: std::fmt::Debug {
    fn root_keys(&self) -> Vec<TileKey>;
    fn get_sub_tile_keys(&self, tile_key: &TileKey) -> Vec<TileKey> {
        tile_key.children().to_vec()
    }
    fn tile_bounds(&self, tile_key: &TileKey) -> AABB;
    fn projection(&self) -> ProjectionType;

    /// World-space size of the root tile, used to translate tile bounds
    /// across wrap-around offsets. Irrelevant when only offset `0` is used.
    fn world_size(&self) -> f64 {
        0.0
    }
}

/// A frustum plane in implicit form: points `p` with `normal.dot(p) + d >= 0`
/// are inside the half-space.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn normalized(normal: Vec3, d: f32) -> Self {
        let len = normal.length().max(f32::EPSILON);
        Plane { normal: normal / len, d: d / len }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// A perspective camera. `view` transforms world space into eye space.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub view: Mat4,
    pub fov_y_radians: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    /// Clones this camera with its near/far planes replaced by
    /// `[minimum, maximum]`, per §4.2's extended-frustum construction.
    pub fn with_extended_planes(&self, minimum: f32, maximum: f32) -> Camera {
        let mut extended = *self;
        extended.near = minimum.min(maximum);
        extended.far = minimum.max(maximum);
        extended
    }

    fn corners(&self) -> [Vec3; 8] {
        let inverse = self.view_projection().inverse();
        let ndc_corners = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];
        ndc_corners.map(|ndc| {
            let world = inverse * ndc.extend(1.0);
            world.truncate() / world.w
        })
    }

    pub fn bounding_aabb(&self) -> AABB {
        AABB::from_points(&self.corners())
    }
}

/// Six half-spaces (left, right, bottom, top, near, far) extracted from a
/// combined view-projection matrix (Gribb-Hartmann).
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_camera(camera: &Camera) -> Self {
        let m = camera.view_projection().to_cols_array();
        let row = |i: usize| -> [f32; 4] { [m[i], m[4 + i], m[8 + i], m[12 + i]] };
        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let combine = |a: [f32; 4], b: [f32; 4], sign: f32| {
            Plane::normalized(
                Vec3::new(a[0] + sign * b[0], a[1] + sign * b[1], a[2] + sign * b[2]),
                a[3] + sign * b[3],
            )
        };

        Frustum {
            planes: [
                combine(r3, r0, 1.0),  // left
                combine(r3, r0, -1.0), // right
                combine(r3, r1, 1.0),  // bottom
                combine(r3, r1, -1.0), // top
                combine(r3, r2, 1.0),  // near
                combine(r3, r2, -1.0), // far
            ],
        }
    }

    /// `true` unless `aabb` lies entirely on the outside of some plane.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        let corners = aabb.corners();
        !self
            .planes
            .iter()
            .any(|plane| corners.iter().all(|&c| plane.signed_distance(c) < 0.0))
    }
}

/// Near/far/min/max clip distances for the current frame, produced from
/// the elevation bounds of every rendered tile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewRanges {
    pub near: f64,
    pub far: f64,
    pub minimum: f64,
    pub maximum: f64,
}

/// Turns the aggregated min/max altitude of this frame's rendered tiles
/// into clip distances for the next frame's camera.
pub trait ClipPlanesEvaluator: std::fmt::Debug {
    fn evaluate_clip_planes(&self, min_altitude: f64, max_altitude: f64) -> ViewRanges;
}

/// Per-tile-key elevation bounds, with a flag marking whether the result
/// is final (`false` while terrain is still loading).
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevationRangeResult {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub calculation_final: bool,
}

/// A coarse, scene-wide elevation range used to build the extended frustum,
/// plus a per-tile query used to annotate each intersected tile.
pub trait ElevationRangeSource: std::fmt::Debug {
    fn view_range(&self) -> (f64, f64);
    fn get_elevation_range(&self, tile_key: &TileKey) -> ElevationRangeResult;
}

/// One tile touched by the frustum, annotated for the election pipeline.
#[derive(Debug, Clone, Copy)]
pub struct IntersectedTile {
    pub tile_key: TileKey,
    pub offset: i32,
    pub area: f64,
    pub distance: f64,
    pub elevation_range: ElevationRangeResult,
}

#[derive(Debug, Default)]
pub struct FrustumIntersectionResult {
    pub tiles: Vec<IntersectedTile>,
    pub all_bounding_boxes_final: bool,
}

/// Computes the tile keys touched by `camera`'s frustum for each level in
/// `zoom_levels`, walking `tiling_scheme`'s quad-tree top-down and pruning
/// subtrees whose bounds don't intersect.
#[allow(clippy::too_many_arguments)]
pub fn intersect_frustum(
    camera: &Camera,
    tiling_scheme: &dyn TilingScheme,
    zoom_levels: &[u32],
    offsets: &[i32],
    world_size: f64,
    elevation_range_source: Option<&dyn ElevationRangeSource>,
    extended_frustum_culling: bool,
) -> FrustumIntersectionResult {
    let effective_camera = match elevation_range_source {
        Some(source) => {
            let (minimum, maximum) = source.view_range();
            camera.with_extended_planes(minimum as f32, maximum as f32)
        }
        None => *camera,
    };

    let frustum = Frustum::from_camera(&effective_camera);
    let frustum_aabb = effective_camera.bounding_aabb();

    let mut tiles = Vec::new();
    let mut all_bounding_boxes_final = true;

    for &offset in offsets {
        let dx = offset as f32 * world_size as f32;
        for &level in zoom_levels {
            for root in tiling_scheme.root_keys() {
                traverse(
                    tiling_scheme,
                    &frustum,
                    &frustum_aabb,
                    &effective_camera,
                    level,
                    root,
                    dx,
                    offset,
                    extended_frustum_culling,
                    elevation_range_source,
                    &mut tiles,
                    &mut all_bounding_boxes_final,
                );
            }
        }
    }

    FrustumIntersectionResult { tiles, all_bounding_boxes_final }
}

#[allow(clippy::too_many_arguments)]
fn traverse(
    tiling_scheme: &dyn TilingScheme,
    frustum: &Frustum,
    frustum_aabb: &AABB,
    camera: &Camera,
    target_level: u32,
    key: TileKey,
    dx: f32,
    offset: i32,
    extended_frustum_culling: bool,
    elevation_range_source: Option<&dyn ElevationRangeSource>,
    out: &mut Vec<IntersectedTile>,
    all_bounding_boxes_final: &mut bool,
) {
    let bounds = tiling_scheme.tile_bounds(&key).translated_x(dx);

    if !frustum.intersects_aabb(&bounds) {
        return;
    }
    if extended_frustum_culling && !frustum_aabb.intersects(&bounds) {
        return;
    }

    if key.level == target_level {
        let distance = camera.position.distance(bounds.center()) as f64;
        let area = projected_area(camera, &bounds);
        let elevation_range = match elevation_range_source {
            Some(source) => source.get_elevation_range(&key),
            None => ElevationRangeResult { calculation_final: true, ..Default::default() },
        };
        *all_bounding_boxes_final &= elevation_range.calculation_final;
        out.push(IntersectedTile { tile_key: key, offset, area, distance, elevation_range });
        return;
    }
    if key.level > target_level {
        return;
    }

    for child in tiling_scheme.get_sub_tile_keys(&key) {
        traverse(
            tiling_scheme,
            frustum,
            frustum_aabb,
            camera,
            target_level,
            child,
            dx,
            offset,
            extended_frustum_culling,
            elevation_range_source,
            out,
            all_bounding_boxes_final,
        );
    }
}

/// Screen-space footprint approximation: a tile's world-space area falls
/// off with the square of its distance to the camera.
fn projected_area(camera: &Camera, bounds: &AABB) -> f64 {
    let distance = camera.position.distance(bounds.center()).max(f32::EPSILON) as f64;
    let footprint = (bounds.max.x - bounds.min.x) as f64 * (bounds.max.z - bounds.min.z) as f64;
    footprint / (distance * distance)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn frustum_intersects_tile_directly_below_camera() {
        let scheme = PlanarTilingScheme { world_size: 1000.0 };
        let camera = looking_down_camera(500.0);
        let result = intersect_frustum(&camera, &scheme, &[0], &[0], scheme.world_size, None, false);
        assert_eq!(result.tiles.len(), 1);
        assert!(result.all_bounding_boxes_final);
    }

    #[test]
    fn frustum_descends_to_requested_level() {
        let scheme = PlanarTilingScheme { world_size: 1000.0 };
        let camera = looking_down_camera(500.0);
        let result = intersect_frustum(&camera, &scheme, &[2], &[0], scheme.world_size, None, false);
        assert!(!result.tiles.is_empty());
        assert!(result.tiles.iter().all(|t| t.tile_key.level == 2));
    }

    #[test]
    fn aabb_intersects_detects_overlap_and_gap() {
        let a = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let overlapping = AABB::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.5, 1.5, 1.5));
        let disjoint = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(6.0, 6.0, 6.0));
        assert!(a.intersects(&overlapping));
        assert!(!a.intersects(&disjoint));
    }
}
