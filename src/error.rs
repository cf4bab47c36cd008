//! Error types for the visible tile set core.
//!
//! The taxonomy is deliberately small (§7): most of what looks like
//! failure in this domain — a datasource with nothing at a key, a tile
//! whose geometry hasn't loaded yet, an elevation source still settling —
//! is not an error, it's "not ready yet", and is represented as state
//! (`Option`, a boolean flag) rather than a `Result`. Only a genuinely
//! invalid configuration is a hard failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VtsError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for the fallible corners of the public API.
pub type VtsResult<T> = Result<T, VtsError>;
