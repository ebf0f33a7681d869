//! Error types for isoview.

use thiserror::Error;

/// Top-level error type for isoview operations.
#[derive(Debug, Error)]
pub enum IsoError {
    /// Voxel store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Streaming window errors
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a voxel store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot serve requests right now
    #[error("Voxel store unavailable")]
    Unavailable,

    /// Chunk lies outside the world bounds of the store
    #[error("Chunk ({x}, {y}) is outside the world")]
    OutOfWorld {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },
}

/// Streaming window errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// A full rebuild was required but the store could not serve it
    #[error("Cannot rebuild window at anchor ({x}, {y}): store unavailable")]
    StoreUnavailable {
        /// Requested anchor X
        x: i32,
        /// Requested anchor Y
        y: i32,
    },

    /// The cameras' views together need a larger window than allowed
    #[error("Camera views need window radius {required}, limit is {max}")]
    ViewsTooWide {
        /// Radius that would hold every view
        required: u32,
        /// Configured maximum radius
        max: u32,
    },
}

/// Result type alias for isoview operations.
pub type IsoResult<T> = Result<T, IsoError>;
