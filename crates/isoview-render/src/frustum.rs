//! Conservative visibility test in projected space.
//!
//! A node is tested by its projected anchor point (a cell's base center, an
//! entity's feet) against the camera's visible rectangle grown by the node's
//! sprite extents and a one-step slack. The test never rejects a node whose
//! sprite overlaps the viewport. The slack keeps every cell one grid step in
//! front of a visible cell visible too, so the walk from the root frontier can
//! always reach a visible cell through visible cells.

use isoview_common::{ProjectedPos, Projection};

use crate::camera::Camera;

/// Sprite extents around a projected anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    /// Reach to the left of the anchor
    pub left: f32,
    /// Reach to the right of the anchor
    pub right: f32,
    /// Reach above the anchor (screen up)
    pub up: f32,
    /// Reach below the anchor (screen down)
    pub down: f32,
}

impl Extents {
    /// Extents of one voxel cell: one tile wide, one tile plus one layer tall.
    #[must_use]
    pub fn cell(projection: &Projection) -> Self {
        Self {
            left: projection.half_width(),
            right: projection.half_width(),
            up: projection.layer_height + projection.half_height(),
            down: projection.half_height(),
        }
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            left: self.left.max(other.left),
            right: self.right.max(other.right),
            up: self.up.max(other.up),
            down: self.down.max(other.down),
        }
    }
}

/// Per-frame visibility test derived from a camera.
#[derive(Debug, Clone, Copy)]
pub struct FrustumCuller {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    slack_x: f32,
    slack_y: f32,
    cell: Extents,
}

impl FrustumCuller {
    /// Builds the culler for a camera's current position, zoom and viewport.
    #[must_use]
    pub fn from_camera(camera: &Camera, projection: &Projection) -> Self {
        let (min_x, min_y, max_x, max_y) = camera.visible_bounds();
        Self::from_bounds(min_x, min_y, max_x, max_y, projection)
    }

    /// Builds a culler for an explicit projected rectangle.
    #[must_use]
    pub fn from_bounds(
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
        projection: &Projection,
    ) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            slack_x: projection.half_width(),
            slack_y: projection.layer_height.max(projection.half_height()),
            cell: Extents::cell(projection),
        }
    }

    /// Whether a cell anchored at `(px, py)` may be visible.
    #[must_use]
    pub fn visible(&self, px: f32, py: f32) -> bool {
        self.visible_extents(ProjectedPos::new(px, py), self.cell)
    }

    /// Whether a node with the given extents anchored at `pos` may be
    /// visible. Extents smaller than a cell's are widened to a cell's.
    #[must_use]
    pub fn visible_extents(&self, pos: ProjectedPos, extents: Extents) -> bool {
        let e = extents.max(self.cell);
        pos.x >= self.min_x - e.right - self.slack_x
            && pos.x <= self.max_x + e.left + self.slack_x
            && pos.y >= self.min_y - e.down - self.slack_y
            && pos.y <= self.max_y + e.up + self.slack_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoview_common::VoxelCoord;

    fn culler() -> FrustumCuller {
        FrustumCuller::from_bounds(-400.0, -300.0, 400.0, 300.0, &Projection::default())
    }

    #[test]
    fn test_center_visible() {
        assert!(culler().visible(0.0, 0.0));
    }

    #[test]
    fn test_far_point_culled() {
        let c = culler();
        assert!(!c.visible(2000.0, 0.0));
        assert!(!c.visible(0.0, -2000.0));
    }

    #[test]
    fn test_partially_overlapping_sprite_is_visible() {
        let c = culler();
        // Sprite's left edge is just inside the right viewport border.
        assert!(c.visible(400.0 + 31.0, 0.0));
        // Sprite's top face reaches into the bottom of the viewport.
        assert!(c.visible(0.0, 300.0 + 32.0 + 15.0));
    }

    #[test]
    fn test_front_step_of_visible_cell_stays_visible() {
        let projection = Projection::default();
        let c = culler();
        // Scan a grid of cells; for every culler-visible cell at least one of
        // its front neighbors must also be culler-visible.
        for x in -40..40 {
            for y in -40..40 {
                for z in 0..6 {
                    let coord = VoxelCoord::new(x, y, z);
                    let p = projection.project_coord(coord);
                    if !c.visible(p.x, p.y) {
                        continue;
                    }
                    let fronts = [
                        coord.offset(1, 0, 0),
                        coord.offset(0, 1, 0),
                        coord.offset(0, 0, 1),
                    ];
                    let any = fronts.iter().any(|f| {
                        let q = projection.project_coord(*f);
                        c.visible(q.x, q.y)
                    });
                    assert!(any, "no visible front step from {coord:?}");
                }
            }
        }
    }

    #[test]
    fn test_entity_extents_widen_test() {
        let projection = Projection::default();
        let c = culler();
        let tall = Extents {
            left: 32.0,
            right: 32.0,
            up: 400.0,
            down: 16.0,
        };
        let below = ProjectedPos::new(0.0, 300.0 + 200.0);
        assert!(!c.visible(below.x, below.y));
        assert!(c.visible_extents(below, tall));
        assert!(!c.visible_extents(below, Extents::cell(&projection)));
    }
}
