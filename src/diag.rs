//! Injectable diagnostics sink, replacing the source's global logger per
//! the design note in §9: the core accepts an optional diagnostics sink
//! rather than writing to a process-wide log.

use crate::key::TileKey;

pub trait Diagnostics: std::fmt::Debug {
    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }

    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn tile_error(&self, data_source: &str, tile_key: TileKey, error: &dyn std::fmt::Display) {
        log::warn!("[{data_source}] tile {tile_key} error: {error}");
    }
}

/// Default sink: forwards to the `log` crate, as `meridian-map-engine`
/// does for its own library-level diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {}
