//! # Isoview World
//!
//! Voxel data side of isoview. The render engine treats everything here as an
//! external collaborator.
//!
//! This crate handles:
//! - Chunk columns of raw voxels
//! - Material properties and the injected sprite lookup
//! - The `VoxelStore` trait, chunk events and an in-memory store
//! - Procedural heightmap generation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod generation;
pub mod material;
pub mod store;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::material::*;
    pub use crate::store::*;
}

pub use prelude::*;
