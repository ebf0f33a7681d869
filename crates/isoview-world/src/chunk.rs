//! Chunk columns holding raw voxel data.

use bytemuck::{Pod, Zeroable};
use isoview_common::{ChunkCoord, ChunkDims, LocalCoord};
use serde::{Deserialize, Serialize};

/// A single voxel: raw material only.
///
/// Render-side properties (sprite, solidity, transparency) come from the
/// injected [`SpriteLookup`](crate::material::SpriteLookup).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct Voxel {
    /// Material type ID (0 = air)
    pub material: u16,
}

impl Voxel {
    /// Empty voxel.
    pub const AIR: Self = Self { material: 0 };

    /// Creates a voxel of the given material.
    #[must_use]
    pub const fn new(material: u16) -> Self {
        Self { material }
    }

    /// Checks if this voxel is air.
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.material == 0
    }
}

/// A fixed-size column of voxels: `width × depth` footprint, full height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Column dimensions
    dims: ChunkDims,
    /// Voxel data, indexed by [`LocalCoord::to_index`]
    voxels: Vec<Voxel>,
}

impl Chunk {
    /// Creates a new chunk filled with air.
    #[must_use]
    pub fn new(coord: ChunkCoord, dims: ChunkDims) -> Self {
        Self {
            coord,
            dims,
            voxels: vec![Voxel::AIR; dims.voxel_count()],
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the chunk dimensions.
    #[must_use]
    pub const fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Gets a voxel at local coordinates; out-of-range reads are air.
    #[must_use]
    pub fn get(&self, local: LocalCoord) -> Voxel {
        if !self.contains(local) {
            return Voxel::AIR;
        }
        self.voxels
            .get(local.to_index(self.dims))
            .copied()
            .unwrap_or(Voxel::AIR)
    }

    /// Sets a voxel at local coordinates. Returns false when out of range.
    pub fn set(&mut self, local: LocalCoord, voxel: Voxel) -> bool {
        if !self.contains(local) {
            return false;
        }
        let index = local.to_index(self.dims);
        if let Some(slot) = self.voxels.get_mut(index) {
            *slot = voxel;
            return true;
        }
        false
    }

    /// Fills the column at (x, y) from z = 0 up to (excluding) `height`.
    pub fn fill_column(&mut self, x: u16, y: u16, height: u16, voxel: Voxel) {
        let top = height.min(self.dims.height as u16);
        for z in 0..top {
            self.set(LocalCoord::new(x, y, z), voxel);
        }
    }

    /// Returns a slice of all voxels.
    #[must_use]
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Returns a mutable slice of all voxels.
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    /// Checks if the chunk holds only air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxels.iter().all(|v| v.is_air())
    }

    fn contains(&self, local: LocalCoord) -> bool {
        u32::from(local.x) < self.dims.width
            && u32::from(local.y) < self.dims.depth
            && u32::from(local.z) < self.dims.height
    }
}
