//! The `DataSource` contract and the per-frame tile list the core rebuilds
//! for each datasource every call to `update_render_list`.

use std::collections::HashMap;

use crate::frustum::TilingScheme;
use crate::key::{CompositeTileId, TileKey};
use crate::tile::TileHandle;

/// A source of tiles for one quad-tree layer (e.g. "buildings", "terrain",
/// the background plane). Implemented by the renderer, consumed by the
/// core only through this capability set.
pub trait DataSource: std::fmt::Debug {
    /// Unique among all datasources registered with one `VisibleTileSet`.
    fn name(&self) -> &str;

    /// Whether tiles from this datasource may be kept in the shared cache.
    /// Non-cacheable datasources get a fresh tile on every request.
    fn cacheable(&self) -> bool;

    fn min_data_level(&self) -> u32;
    fn max_data_level(&self) -> u32;

    /// Converts the camera's zoom level into this datasource's own storage
    /// zoom level (datasources may store data more coarsely than the
    /// camera's display resolution).
    fn get_data_zoom_level(&self, camera_zoom: u32) -> u32;

    fn tiling_scheme(&self) -> &dyn TilingScheme;

    /// Produces a tile for `tile_key`, or `None` if this datasource has
    /// nothing there (not an error — election simply skips it).
    fn get_tile(&self, tile_key: TileKey, touch: bool) -> Option<TileHandle>;

    fn can_get_tile(&self, level: u32, tile_key: &TileKey) -> bool {
        let _ = tile_key;
        level >= self.min_data_level() && level <= self.max_data_level()
    }

    /// Fully-covering datasources (e.g. a background plane, a basemap)
    /// participate in overlap suppression (§4.4).
    fn is_fully_covering(&self) -> bool {
        false
    }

    /// Whether the fallback searcher (§4.6) may substitute ancestors or
    /// descendants for tiles of this datasource.
    fn allow_overlapping_tiles(&self) -> bool {
        true
    }

    /// One-bit tag distinguishing the background datasource for overlap
    /// suppression, per the design note on avoiding runtime type identity.
    fn is_background(&self) -> bool {
        false
    }
}

/// Per-frame, per-datasource output of `update_render_list`. Rebuilt every
/// frame; never diffed against the previous one.
#[derive(Debug, Default)]
pub struct DataSourceTileList {
    pub zoom_level: u32,
    pub storage_level: u32,
    pub all_visible_tile_loaded: bool,
    pub num_tiles_loading: u32,
    pub visible_tiles: Vec<TileHandle>,
    pub rendered_tiles: HashMap<CompositeTileId, TileHandle>,
}

impl DataSourceTileList {
    pub fn new(zoom_level: u32, storage_level: u32) -> Self {
        DataSourceTileList {
            zoom_level,
            storage_level,
            all_visible_tile_loaded: true,
            num_tiles_loading: 0,
            visible_tiles: Vec::new(),
            rendered_tiles: HashMap::new(),
        }
    }
}
