//! Graph nodes shared by the depth walk: cells and entities behind one tag.

use isoview_common::{CameraId, ProjectedPos, Projection};

use crate::cell::RenderCell;
use crate::depth_list::{DrawItem, NodeKey};
use crate::entity::EntityNode;
use crate::visit::{FrameEpoch, VisitMarks};

/// Reference to a node of the occlusion graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Window cell index
    Cell(u32),
    /// Entity arena index
    Entity(u32),
}

/// Capabilities every occlusion graph node exposes to the walk.
pub trait DepthNode {
    /// Frame-independent identity.
    fn key(&self) -> NodeKey;

    /// Visitation marks.
    fn marks(&self) -> &VisitMarks;

    /// Mutable visitation marks.
    fn marks_mut(&mut self) -> &mut VisitMarks;

    /// Projected anchor point used for culling.
    fn projected(&self, projection: &Projection) -> ProjectedPos;

    /// Scalar depth estimate; larger is closer to the viewer.
    fn depth_key(&self, projection: &Projection) -> f32;

    /// Whether the node is drawn under the given z limit.
    fn is_render_eligible(&self, z_limit: Option<i32>) -> bool;

    /// The draw item for this node, if it has something to draw.
    fn draw_item(&self, z_limit: Option<i32>) -> Option<DrawItem>;

    /// Whether the camera entered this node this frame.
    fn is_visited(&self, camera: CameraId, epoch: FrameEpoch) -> bool {
        self.marks().is_visited(camera, epoch)
    }

    /// Marks the node entered this frame.
    fn mark_visited(&mut self, camera: CameraId, epoch: FrameEpoch) {
        self.marks_mut().mark_visited(camera, epoch);
    }
}

impl DepthNode for RenderCell {
    fn key(&self) -> NodeKey {
        NodeKey::Cell(self.coord())
    }

    fn marks(&self) -> &VisitMarks {
        RenderCell::marks(self)
    }

    fn marks_mut(&mut self) -> &mut VisitMarks {
        RenderCell::marks_mut(self)
    }

    fn projected(&self, projection: &Projection) -> ProjectedPos {
        projection.project_coord(self.coord())
    }

    fn depth_key(&self, projection: &Projection) -> f32 {
        projection.depth_key(self.coord().base_center())
    }

    fn is_render_eligible(&self, z_limit: Option<i32>) -> bool {
        RenderCell::is_render_eligible(self, z_limit)
    }

    fn draw_item(&self, z_limit: Option<i32>) -> Option<DrawItem> {
        self.sprite().map(|sprite| DrawItem::Cell {
            coord: self.coord(),
            sprite,
            clip: self.effective_clip(z_limit),
        })
    }
}

impl DepthNode for EntityNode {
    fn key(&self) -> NodeKey {
        NodeKey::Entity(self.entity().id)
    }

    fn marks(&self) -> &VisitMarks {
        EntityNode::marks(self)
    }

    fn marks_mut(&mut self) -> &mut VisitMarks {
        EntityNode::marks_mut(self)
    }

    fn projected(&self, projection: &Projection) -> ProjectedPos {
        self.entity().projected(projection)
    }

    fn depth_key(&self, projection: &Projection) -> f32 {
        self.entity().depth_key(projection)
    }

    fn is_render_eligible(&self, z_limit: Option<i32>) -> bool {
        self.entity().is_render_eligible(z_limit)
    }

    fn draw_item(&self, _z_limit: Option<i32>) -> Option<DrawItem> {
        Some(DrawItem::Entity {
            id: self.entity().id,
            position: self.entity().position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoview_common::VoxelCoord;
    use isoview_world::MaterialInfo;

    #[test]
    fn test_cell_node_draw_item() {
        let cell = RenderCell::wrap(VoxelCoord::new(1, 2, 3), 1, MaterialInfo::block(9));
        let node: &dyn DepthNode = &cell;
        assert_eq!(node.key(), NodeKey::Cell(VoxelCoord::new(1, 2, 3)));
        assert!(matches!(
            node.draw_item(None),
            Some(DrawItem::Cell { clip: 0, .. })
        ));
        assert!(node.is_render_eligible(None));
    }

    #[test]
    fn test_air_cell_has_no_draw_item() {
        let cell = RenderCell::wrap(VoxelCoord::new(0, 0, 0), 0, MaterialInfo::AIR);
        assert!(DepthNode::draw_item(&cell, None).is_none());
        assert!(!DepthNode::is_render_eligible(&cell, None));
    }

    #[test]
    fn test_marks_through_trait() {
        let mut cell = RenderCell::absent(VoxelCoord::new(0, 0, 0));
        let mut epoch = FrameEpoch::START;
        epoch.advance();
        assert!(!DepthNode::is_visited(&cell, CameraId::PRIMARY, epoch));
        DepthNode::mark_visited(&mut cell, CameraId::PRIMARY, epoch);
        assert!(DepthNode::is_visited(&cell, CameraId::PRIMARY, epoch));
    }
}
