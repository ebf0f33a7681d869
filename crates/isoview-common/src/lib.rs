//! # Isoview Common
//!
//! Common types shared by the isoview crates:
//! - Coordinate types (voxel, chunk, local) and the isometric projection
//! - ID types (EntityId, CameraId, SpriteId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_camera_id_bounds() {
        assert_eq!(CameraId::new(0), Some(CameraId::PRIMARY));
        assert!(CameraId::new(MAX_CAMERAS as u8).is_none());
    }

    proptest! {
        #[test]
        fn voxel_lies_inside_its_chunk(x in -500i32..500, y in -500i32..500, z in 0i32..32) {
            let dims = ChunkDims::new(16, 8, 32);
            let coord = VoxelCoord::new(x, y, z);
            let chunk = coord.to_chunk_coord(dims);
            let origin = chunk.origin(dims);
            prop_assert!(coord.x >= origin.x && coord.x < origin.x + 16);
            prop_assert!(coord.y >= origin.y && coord.y < origin.y + 8);
        }
    }
}
