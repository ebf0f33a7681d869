//! Coordinate types for voxel, chunk, local and projected positions.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Continuous world position (x, y on the ground plane, z up).
pub type Point = Vec3;

/// Position in isometric screen space before camera transform.
pub type ProjectedPos = Vec2;

/// Integer voxel coordinate (global grid cell identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    /// X coordinate in grid space
    pub x: i32,
    /// Y coordinate in grid space
    pub y: i32,
    /// Z coordinate (layer, up)
    pub z: i32,
}

impl VoxelCoord {
    /// Creates a new voxel coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the cell containing a continuous point.
    #[must_use]
    pub fn from_point(point: Point) -> Self {
        Self {
            x: point.x.floor() as i32,
            y: point.y.floor() as i32,
            z: point.z.floor() as i32,
        }
    }

    /// Returns the point at the center of the cell's base.
    #[must_use]
    pub fn base_center(self) -> Point {
        Vec3::new(self.x as f32 + 0.5, self.y as f32 + 0.5, self.z as f32)
    }

    /// Returns this coordinate shifted by the given delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Converts to the chunk column containing this voxel.
    #[must_use]
    pub const fn to_chunk_coord(self, dims: ChunkDims) -> ChunkCoord {
        ChunkCoord {
            x: self.x.div_euclid(dims.width as i32),
            y: self.y.div_euclid(dims.depth as i32),
        }
    }

    /// Converts to a local coordinate within its chunk.
    ///
    /// Returns `None` when z is outside the column height.
    #[must_use]
    pub const fn to_local_coord(self, dims: ChunkDims) -> Option<LocalCoord> {
        if self.z < 0 || self.z >= dims.height as i32 {
            return None;
        }
        Some(LocalCoord {
            x: self.x.rem_euclid(dims.width as i32) as u16,
            y: self.y.rem_euclid(dims.depth as i32) as u16,
            z: self.z as u16,
        })
    }
}

/// Chunk column coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the voxel coordinate of the chunk's lowest corner.
    #[must_use]
    pub const fn origin(self, dims: ChunkDims) -> VoxelCoord {
        VoxelCoord {
            x: self.x * dims.width as i32,
            y: self.y * dims.depth as i32,
            z: 0,
        }
    }

    /// Returns this coordinate shifted by the given delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (chessboard) distance in chunks.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Iterates every chunk within Chebyshev `radius` of this one, row by row.
    pub fn square(self, radius: u32) -> impl Iterator<Item = ChunkCoord> {
        let r = radius as i32;
        (-r..=r).flat_map(move |dy| (-r..=r).map(move |dx| self.offset(dx, dy)))
    }
}

/// Local voxel coordinate within a chunk column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalCoord {
    /// X within chunk
    pub x: u16,
    /// Y within chunk
    pub y: u16,
    /// Z within chunk (same as global z)
    pub z: u16,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Converts to a linear index, z-major then y then x.
    #[must_use]
    pub const fn to_index(self, dims: ChunkDims) -> usize {
        let w = dims.width as usize;
        let d = dims.depth as usize;
        (self.z as usize) * w * d + (self.y as usize) * w + (self.x as usize)
    }

    /// Creates from a linear index.
    #[must_use]
    pub const fn from_index(index: usize, dims: ChunkDims) -> Self {
        let w = dims.width as usize;
        let d = dims.depth as usize;
        Self {
            x: (index % w) as u16,
            y: ((index / w) % d) as u16,
            z: (index / (w * d)) as u16,
        }
    }
}

/// Size of a chunk column in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    /// Footprint size along x
    pub width: u32,
    /// Footprint size along y
    pub depth: u32,
    /// Full column height along z
    pub height: u32,
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self {
            width: 16,
            depth: 16,
            height: 32,
        }
    }
}

impl ChunkDims {
    /// Creates new chunk dimensions.
    #[must_use]
    pub const fn new(width: u32, depth: u32, height: u32) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    /// Number of voxels in one chunk.
    #[must_use]
    pub const fn voxel_count(self) -> usize {
        (self.width as usize) * (self.depth as usize) * (self.height as usize)
    }
}

/// 2:1 isometric projection parameters, in projected units (pixels at zoom 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Width of one tile's diamond
    pub tile_width: f32,
    /// Height of one tile's diamond
    pub tile_height: f32,
    /// Vertical offset of one z layer
    pub layer_height: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            tile_width: 64.0,
            tile_height: 32.0,
            layer_height: 32.0,
        }
    }
}

impl Projection {
    /// Half the tile width.
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.tile_width * 0.5
    }

    /// Half the tile height.
    #[must_use]
    pub fn half_height(&self) -> f32 {
        self.tile_height * 0.5
    }

    /// Projects a continuous world point to screen space.
    ///
    /// Screen Y grows downward; higher z moves up the screen.
    #[must_use]
    pub fn project(&self, point: Point) -> ProjectedPos {
        Vec2::new(
            (point.x - point.y) * self.half_width(),
            (point.x + point.y) * self.half_height() - point.z * self.layer_height,
        )
    }

    /// Projects the base center of a voxel cell.
    #[must_use]
    pub fn project_coord(&self, coord: VoxelCoord) -> ProjectedPos {
        self.project(coord.base_center())
    }

    /// Inverse projection onto the horizontal plane at height `z`.
    #[must_use]
    pub fn unproject(&self, pos: ProjectedPos, z: f32) -> Point {
        let u = pos.x / self.half_width();
        let v = (pos.y + z * self.layer_height) / self.half_height();
        Vec3::new((u + v) * 0.5, (v - u) * 0.5, z)
    }

    /// Scalar depth estimate: ground projected-Y plus height-weighted z.
    ///
    /// Larger values are closer to the viewer.
    #[must_use]
    pub fn depth_key(&self, point: Point) -> f32 {
        (point.x + point.y) * self.half_height() + point.z * self.layer_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_to_chunk_negative() {
        let dims = ChunkDims::new(16, 16, 32);
        assert_eq!(
            VoxelCoord::new(-1, 15, 0).to_chunk_coord(dims),
            ChunkCoord::new(-1, 0)
        );
        assert_eq!(
            VoxelCoord::new(-17, 16, 3).to_chunk_coord(dims),
            ChunkCoord::new(-2, 1)
        );
    }

    #[test]
    fn test_local_coord_out_of_column() {
        let dims = ChunkDims::new(4, 4, 8);
        assert!(VoxelCoord::new(0, 0, 8).to_local_coord(dims).is_none());
        assert!(VoxelCoord::new(0, 0, -1).to_local_coord(dims).is_none());
        assert_eq!(
            VoxelCoord::new(-1, 5, 2).to_local_coord(dims),
            Some(LocalCoord::new(3, 1, 2))
        );
    }

    #[test]
    fn test_local_index_roundtrip() {
        let dims = ChunkDims::new(4, 5, 6);
        for index in 0..dims.voxel_count() {
            assert_eq!(LocalCoord::from_index(index, dims).to_index(dims), index);
        }
    }

    #[test]
    fn test_chunk_square() {
        let center = ChunkCoord::new(2, -1);
        let chunks: Vec<_> = center.square(1).collect();
        assert_eq!(chunks.len(), 9);
        assert!(chunks.iter().all(|c| c.chebyshev_distance(center) <= 1));
    }

    #[test]
    fn test_projection_layers_move_up() {
        let proj = Projection::default();
        let low = proj.project_coord(VoxelCoord::new(0, 0, 0));
        let high = proj.project_coord(VoxelCoord::new(0, 0, 1));
        assert!((low.x - high.x).abs() < f32::EPSILON);
        assert!((low.y - high.y - proj.layer_height).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let proj = Projection::default();
        let point = Vec3::new(12.25, -3.5, 4.0);
        let back = proj.unproject(proj.project(point), point.z);
        assert!((back - point).length() < 1e-4);
    }

    #[test]
    fn test_depth_key_front_is_larger() {
        let proj = Projection::default();
        let back = proj.depth_key(VoxelCoord::new(0, 0, 0).base_center());
        assert!(proj.depth_key(VoxelCoord::new(1, 0, 0).base_center()) > back);
        assert!(proj.depth_key(VoxelCoord::new(0, 1, 0).base_center()) > back);
        assert!(proj.depth_key(VoxelCoord::new(0, 0, 1).base_center()) > back);
    }
}
