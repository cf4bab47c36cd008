//! Quad-tree tile keys, their morton encoding, and the composite id used
//! to address a tile within one datasource's per-frame visible set.

use serde::{Deserialize, Serialize};

/// A quad-tree position: zoom level plus row/column within that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u32,
    pub row: u32,
    pub column: u32,
}

impl TileKey {
    pub fn new(level: u32, row: u32, column: u32) -> Self {
        Self { level, row, column }
    }

    pub fn root() -> Self {
        Self::new(0, 0, 0)
    }

    /// Interleaves `row`/`column` into a 64-bit Z-order code, prefixed with
    /// a marker bit so that keys at different levels never collide: the
    /// marker sits at bit `2 * level`, followed by `level` row/column pairs
    /// from most to least significant.
    pub fn morton_code(&self) -> u64 {
        let mut code: u64 = 1;
        for i in (0..self.level).rev() {
            let row_bit = (self.row >> i) & 1;
            let col_bit = (self.column >> i) & 1;
            code = (code << 2) | ((row_bit as u64) << 1) | col_bit as u64;
        }
        code
    }

    /// The tile key one level up, at `row / 2, column / 2`.
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(TileKey::new(self.level - 1, self.row / 2, self.column / 2))
    }

    /// The four tile keys one level down.
    pub fn children(&self) -> [TileKey; 4] {
        let level = self.level + 1;
        let row = self.row * 2;
        let column = self.column * 2;
        [
            TileKey::new(level, row, column),
            TileKey::new(level, row, column + 1),
            TileKey::new(level, row + 1, column),
            TileKey::new(level, row + 1, column + 1),
        ]
    }

    /// `true` if `self` is reachable from `ancestor` by repeated `parent()`.
    pub fn is_descendant_of(&self, ancestor: &TileKey) -> bool {
        if self.level <= ancestor.level {
            return false;
        }
        let shift = self.level - ancestor.level;
        (self.row >> shift) == ancestor.row && (self.column >> shift) == ancestor.column
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.row, self.column)
    }
}

/// Longitudinal wrap-around copy index for globe-crossing views.
pub type TileOffset = i32;

/// Bias applied so a signed offset packs into an unsigned bit field.
const OFFSET_BIAS: i64 = 1 << 9;
/// Bits reserved for the biased offset in a [`CompositeTileId`].
const OFFSET_BITS: u32 = 10;
const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

/// Opaque map key combining a tile's morton code and its offset, used only
/// within one datasource's per-frame visible/rendered tile maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeTileId(u64);

impl CompositeTileId {
    pub fn for_key_and_offset(tile_key: &TileKey, offset: TileOffset) -> Self {
        let morton = tile_key.morton_code();
        let biased = (offset as i64 + OFFSET_BIAS) as u64 & OFFSET_MASK;
        CompositeTileId((morton << OFFSET_BITS) | biased)
    }

    pub fn morton(&self) -> u64 {
        self.0 >> OFFSET_BITS
    }

    pub fn offset(&self) -> TileOffset {
        let biased = self.0 & OFFSET_MASK;
        (biased as i64 - OFFSET_BIAS) as TileOffset
    }

    /// Replaces the morton part with its parent's, preserving the offset.
    /// Morton codes are built by prepending a 2-bit pair per level, so the
    /// parent's code at `level - 1` is exactly `morton >> 2`.
    pub fn parent_key(&self) -> Self {
        let parent_morton = self.morton() >> 2;
        let offset_bits = self.0 & OFFSET_MASK;
        CompositeTileId((parent_morton << OFFSET_BITS) | offset_bits)
    }
}

/// Structural identifier equivalent to `(dataSourceName, morton, offset)`:
/// entries with the same triple are the same cached tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub data_source_name: String,
    pub morton: u64,
    pub offset: TileOffset,
}

impl CacheKey {
    pub fn new(data_source_name: impl Into<String>, tile_key: &TileKey, offset: TileOffset) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            morton: tile_key.morton_code(),
            offset,
        }
    }
}
