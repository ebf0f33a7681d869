//! Render cells: the streaming window's per-voxel wrappers.

use isoview_common::{SpriteId, VoxelCoord};
use isoview_world::MaterialInfo;

use crate::visit::VisitMarks;

/// Static cell flag bits.
pub struct CellFlags;

impl CellFlags {
    /// Cell belongs to a resident chunk - bit 0
    pub const PRESENT: u8 = 1 << 0;
    /// Cell occupies its space - bit 1
    pub const SOLID: u8 = 1 << 1;
    /// Cell lets neighbors show through - bit 2
    pub const TRANSPARENT: u8 = 1 << 2;
    /// Cell blocks movement - bit 3
    pub const OBSTACLE: u8 = 1 << 3;
}

/// Per-side clip bits: a set bit means that visible face is hidden by an
/// opaque neighbor.
pub struct ClipFlags;

impl ClipFlags {
    /// +x face (lower right on screen) - bit 0
    pub const RIGHT: u8 = 1 << 0;
    /// +y face (lower left on screen) - bit 1
    pub const LEFT: u8 = 1 << 1;
    /// +z face (top) - bit 2
    pub const TOP: u8 = 1 << 2;
    /// All visible faces
    pub const ALL: u8 = Self::RIGHT | Self::LEFT | Self::TOP;
}

/// The cells a node covers: at most one per back axis (-x, -y, -z).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverSet {
    items: [u32; 3],
    len: u8,
}

impl CoverSet {
    /// Adds a window cell index.
    pub fn push(&mut self, index: u32) {
        if (self.len as usize) < self.items.len() {
            self.items[self.len as usize] = index;
            self.len += 1;
        }
    }

    /// Number of covered cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Checks if nothing is covered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the covered cell at position `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<u32> {
        self.as_slice().get(i).copied()
    }

    /// Covered cell indices.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.items[..self.len as usize]
    }

    /// Checks if a cell index is covered.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        self.as_slice().contains(&index)
    }
}

/// Window wrapper around one voxel.
#[derive(Debug, Clone)]
pub struct RenderCell {
    /// Grid position
    coord: VoxelCoord,
    /// Raw material
    material: u16,
    /// Sprite to draw, if any
    sprite: Option<SpriteId>,
    /// Static flags (see [`CellFlags`])
    flags: u8,
    /// Side clip flags (see [`ClipFlags`])
    clip: u8,
    /// Back neighbors this cell is drawn over
    covers: CoverSet,
    /// Entity arena indices bound this frame, back to front
    bound: Vec<u32>,
    /// Per-camera visitation marks
    marks: VisitMarks,
}

impl RenderCell {
    /// A placeholder for a voxel whose chunk is not resident.
    #[must_use]
    pub fn absent(coord: VoxelCoord) -> Self {
        Self {
            coord,
            material: 0,
            sprite: None,
            flags: 0,
            clip: 0,
            covers: CoverSet::default(),
            bound: Vec::new(),
            marks: VisitMarks::default(),
        }
    }

    /// Wraps a resident voxel.
    #[must_use]
    pub fn wrap(coord: VoxelCoord, material: u16, info: MaterialInfo) -> Self {
        let mut flags = CellFlags::PRESENT;
        if info.solid {
            flags |= CellFlags::SOLID;
        }
        if info.transparent {
            flags |= CellFlags::TRANSPARENT;
        }
        if info.obstacle {
            flags |= CellFlags::OBSTACLE;
        }
        Self {
            sprite: info.sprite,
            material,
            flags,
            ..Self::absent(coord)
        }
    }

    /// Grid position.
    #[must_use]
    pub const fn coord(&self) -> VoxelCoord {
        self.coord
    }

    /// Raw material.
    #[must_use]
    pub const fn material(&self) -> u16 {
        self.material
    }

    /// Sprite to draw.
    #[must_use]
    pub const fn sprite(&self) -> Option<SpriteId> {
        self.sprite
    }

    /// Whether the cell's chunk is resident.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.flags & CellFlags::PRESENT != 0
    }

    /// Whether the cell is solid.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.flags & CellFlags::SOLID != 0
    }

    /// Whether the cell is transparent.
    #[must_use]
    pub const fn is_transparent(&self) -> bool {
        self.flags & CellFlags::TRANSPARENT != 0
    }

    /// Whether the cell blocks movement.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        self.flags & CellFlags::OBSTACLE != 0
    }

    /// Whether the cell hides faces behind it.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.is_solid() && !self.is_transparent()
    }

    /// Raw side clip flags.
    #[must_use]
    pub const fn clip(&self) -> u8 {
        self.clip
    }

    /// Clip flags as drawn under a z limit: the cutaway layer shows its top.
    #[must_use]
    pub fn effective_clip(&self, z_limit: Option<i32>) -> u8 {
        if z_limit == Some(self.coord.z) {
            self.clip & !ClipFlags::TOP
        } else {
            self.clip
        }
    }

    /// Covered back neighbors.
    #[must_use]
    pub const fn covers(&self) -> &CoverSet {
        &self.covers
    }

    /// Entities bound to this cell for the current walk.
    #[must_use]
    pub fn bound(&self) -> &[u32] {
        &self.bound
    }

    /// Visitation marks.
    #[must_use]
    pub const fn marks(&self) -> &VisitMarks {
        &self.marks
    }

    /// Mutable visitation marks.
    pub fn marks_mut(&mut self) -> &mut VisitMarks {
        &mut self.marks
    }

    /// Whether the cell would be drawn: has a sprite, is at or below the z
    /// limit and keeps at least one face exposed.
    #[must_use]
    pub fn is_render_eligible(&self, z_limit: Option<i32>) -> bool {
        if self.sprite.is_none() {
            return false;
        }
        if z_limit.is_some_and(|limit| self.coord.z > limit) {
            return false;
        }
        self.effective_clip(z_limit) != ClipFlags::ALL
    }

    pub(crate) fn set_links(&mut self, clip: u8, covers: CoverSet) {
        self.clip = clip;
        self.covers = covers;
    }

    pub(crate) fn bound_mut(&mut self) -> &mut Vec<u32> {
        &mut self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_cell() {
        let cell = RenderCell::absent(VoxelCoord::new(1, 2, 3));
        assert!(!cell.is_present());
        assert!(!cell.is_render_eligible(None));
    }

    #[test]
    fn test_wrap_flags() {
        let cell = RenderCell::wrap(
            VoxelCoord::new(0, 0, 0),
            6,
            MaterialInfo::see_through(6, true),
        );
        assert!(cell.is_present());
        assert!(cell.is_solid());
        assert!(cell.is_transparent());
        assert!(cell.is_obstacle());
        assert!(!cell.is_opaque());
    }

    #[test]
    fn test_fully_clipped_cell_not_eligible() {
        let mut cell = RenderCell::wrap(VoxelCoord::new(0, 0, 4), 1, MaterialInfo::block(1));
        cell.set_links(ClipFlags::ALL, CoverSet::default());
        assert!(!cell.is_render_eligible(None));
        // The cutaway layer exposes the top face.
        assert!(cell.is_render_eligible(Some(4)));
        assert!(!cell.is_render_eligible(Some(3)));
    }

    #[test]
    fn test_cover_set_caps_at_three() {
        let mut covers = CoverSet::default();
        for i in 0..5 {
            covers.push(i);
        }
        assert_eq!(covers.as_slice(), &[0, 1, 2]);
        assert!(covers.contains(2));
        assert!(!covers.contains(3));
    }
}
