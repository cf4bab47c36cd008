//! The `Tile` contract: the core's view of a datasource-owned tile.
//!
//! A [`Tile`] is a concrete struct the core fully owns and mutates
//! (bookkeeping fields: visibility, frame numbers, rendering flags) plus a
//! [`TilePayload`] trait object the datasource controls (meshes, textures,
//! decoded buffers — opaque to the core beyond the handful of lifecycle
//! calls it needs). Handles are shared via `Rc<RefCell<Tile>>` rather than
//! by reference: the core, the election pipeline, and the cache all need
//! independent, simultaneously-live views of the same tile within one
//! frame, and disposal must stay explicit and idempotent rather than
//! riding on a garbage collector.

use std::cell::RefCell;
use std::rc::Rc;

use crate::key::{CompositeTileId, TileKey, TileOffset};

/// Shared handle to a tile. Single-threaded: never sent across threads.
pub type TileHandle = Rc<RefCell<Tile>>;

/// Elevation bounds used to extend the frustum and to evaluate clip planes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElevationRange {
    pub min_elevation: f64,
    pub max_elevation: f64,
}

/// Altitude bounds of a tile's geographic box, read to aggregate elevation
/// for clip-plane evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoBox {
    pub min_altitude: f64,
    pub max_altitude: f64,
}

/// The datasource-owned, opaque part of a tile: its payload.
pub trait TilePayload: std::fmt::Debug {
    /// Bytes currently owned by the tile. Must be cheap to call; called
    /// repeatedly by the cache's size accounting.
    fn memory_usage(&self) -> u64;

    fn has_geometry(&self) -> bool;

    fn all_geometry_loaded(&self) -> bool;

    /// Extra tile keys whose tiles must also be elected. Empty unless the
    /// payload introduces cross-tile references (e.g. a label that spans
    /// tile boundaries).
    fn dependencies(&self) -> &[TileKey] {
        &[]
    }

    fn geo_box(&self) -> GeoBox {
        GeoBox::default()
    }

    /// Begins or resumes fetching/decoding. Fire-and-forget: the core
    /// never awaits this, it only observes `has_geometry`/
    /// `all_geometry_loaded` on a later frame.
    fn load(&mut self);

    /// Releases all owned resources. Must be safe to call more than once.
    fn dispose(&mut self);
}

/// The task-queue-facing part of a tile's load: priority and cancellation.
pub trait TileLoader: std::fmt::Debug {
    fn priority(&self) -> f64 {
        0.0
    }

    fn cancel(&mut self);
}

/// A tile: core-owned bookkeeping plus an opaque payload.
#[derive(Debug)]
pub struct Tile {
    pub tile_key: TileKey,
    pub offset: TileOffset,
    pub data_source_name: String,
    pub unique_key: CompositeTileId,

    /// Positive: tile rendered in place of a descendant fallback target.
    /// Negative: ancestor fallback. Zero: exact match.
    pub level_offset: i32,

    pub is_visible: bool,
    pub delay_rendering: bool,
    pub skip_rendering: bool,

    pub frame_num_last_requested: i64,
    pub frame_num_visible: i64,
    pub frame_num_last_visible: i64,
    pub num_frames_visible: u64,

    pub visible_area: f64,
    pub elevation_range: ElevationRange,

    payload: Box<dyn TilePayload>,
    loader: Option<Box<dyn TileLoader>>,
    disposed: bool,
}

impl Tile {
    pub fn new(
        tile_key: TileKey,
        offset: TileOffset,
        data_source_name: impl Into<String>,
        payload: Box<dyn TilePayload>,
    ) -> Self {
        Tile {
            tile_key,
            offset,
            data_source_name: data_source_name.into(),
            unique_key: CompositeTileId::for_key_and_offset(&tile_key, offset),
            level_offset: 0,
            is_visible: false,
            delay_rendering: false,
            skip_rendering: false,
            frame_num_last_requested: -1,
            frame_num_visible: -1,
            frame_num_last_visible: -1,
            num_frames_visible: 0,
            visible_area: 0.0,
            elevation_range: ElevationRange::default(),
            payload,
            loader: None,
            disposed: false,
        }
    }

    pub fn memory_usage(&self) -> u64 {
        self.payload.memory_usage()
    }

    pub fn has_geometry(&self) -> bool {
        self.payload.has_geometry()
    }

    pub fn all_geometry_loaded(&self) -> bool {
        self.payload.all_geometry_loaded()
    }

    pub fn dependencies(&self) -> &[TileKey] {
        self.payload.dependencies()
    }

    pub fn geo_box(&self) -> GeoBox {
        self.payload.geo_box()
    }

    pub fn is_ready(&self) -> bool {
        self.has_geometry() && !self.delay_rendering
    }

    /// `true` iff the tile has never been visible (used by frame admission).
    pub fn is_new(&self) -> bool {
        self.frame_num_visible < 0
    }

    pub fn touch(&mut self, frame_number: i64) {
        self.frame_num_last_requested = frame_number;
    }

    /// Re-addresses this tile to a different wrap-around offset, keeping
    /// `unique_key` consistent with it.
    pub fn set_offset(&mut self, offset: TileOffset) {
        self.offset = offset;
        self.unique_key = CompositeTileId::for_key_and_offset(&self.tile_key, offset);
    }

    pub fn set_loader(&mut self, loader: Box<dyn TileLoader>) {
        self.loader = Some(loader);
    }

    pub fn loader_priority(&self) -> f64 {
        self.loader.as_ref().map(|l| l.priority()).unwrap_or(0.0)
    }

    pub fn cancel_loader(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            loader.cancel();
        }
    }

    pub fn load(&mut self) {
        self.payload.load();
    }

    /// Releases owned resources. Safe to call more than once: the second
    /// and later calls are a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_loader();
        self.payload.dispose();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
