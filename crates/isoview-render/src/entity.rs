//! Dynamic entities and the engine-side arena that tracks them across frames.

use ahash::AHashMap;
use glam::Vec3;
use isoview_common::{CameraId, EntityId, Point, ProjectedPos, Projection, VoxelCoord};

use crate::frustum::Extents;
use crate::visit::VisitMarks;

/// Default bounding radius in grid units.
pub const DEFAULT_ENTITY_RADIUS: f32 = 0.3;

/// Default height in grid units.
pub const DEFAULT_ENTITY_HEIGHT: f32 = 1.0;

/// An independently positioned dynamic object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    /// Identity
    pub id: EntityId,
    /// Feet position in grid space
    pub position: Point,
    /// Bounding radius in grid units
    pub radius: f32,
    /// Height in grid units
    pub height: f32,
    /// Hidden entities are never drawn
    pub hidden: bool,
}

impl Entity {
    /// Creates a visible entity with default size.
    #[must_use]
    pub fn new(id: EntityId, position: Point) -> Self {
        Self {
            id,
            position,
            radius: DEFAULT_ENTITY_RADIUS,
            height: DEFAULT_ENTITY_HEIGHT,
            hidden: false,
        }
    }

    /// Sets the bounding radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the height.
    #[must_use]
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Sets the hidden flag.
    #[must_use]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// The grid cell the entity stands in.
    #[must_use]
    pub fn coord(&self) -> VoxelCoord {
        VoxelCoord::from_point(self.position)
    }

    /// Projected feet position.
    #[must_use]
    pub fn projected(&self, projection: &Projection) -> ProjectedPos {
        projection.project(self.position)
    }

    /// Scalar depth, measured at half height.
    #[must_use]
    pub fn depth_key(&self, projection: &Projection) -> f32 {
        let center = self.position + Vec3::new(0.0, 0.0, self.height * 0.5);
        projection.depth_key(center)
    }

    /// Projected sprite extents around the feet position.
    #[must_use]
    pub fn extents(&self, projection: &Projection) -> Extents {
        let across = self.radius * projection.tile_width;
        Extents {
            left: across,
            right: across,
            up: self.height * projection.layer_height + self.radius * projection.tile_height,
            down: self.radius * projection.tile_height,
        }
    }

    /// Whether the entity may be drawn under a z limit.
    #[must_use]
    pub fn is_render_eligible(&self, z_limit: Option<i32>) -> bool {
        !self.hidden && z_limit.map_or(true, |limit| self.coord().z <= limit)
    }
}

/// Supplies the live entities every tick.
pub trait EntitySource {
    /// Returns a snapshot of all live entities.
    fn live_entities(&self) -> Vec<Entity>;
}

impl EntitySource for [Entity] {
    fn live_entities(&self) -> Vec<Entity> {
        self.to_vec()
    }
}

impl EntitySource for Vec<Entity> {
    fn live_entities(&self) -> Vec<Entity> {
        self.clone()
    }
}

/// An entity plus the engine state attached to it.
#[derive(Debug, Clone)]
pub struct EntityNode {
    entity: Entity,
    marks: VisitMarks,
    host: Option<u32>,
    stamp: u64,
}

impl EntityNode {
    /// The entity snapshot for this tick.
    #[must_use]
    pub const fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Window index of the cell this entity is bound to this frame.
    #[must_use]
    pub const fn host(&self) -> Option<u32> {
        self.host
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

    pub(crate) fn set_host(&mut self, host: Option<u32>) {
        self.host = host;
    }
}

/// Dense storage of live entities, keyed by [`EntityId`].
///
/// Nodes keep their visitation marks while their entity stays alive.
#[derive(Debug, Default)]
pub struct EntityArena {
    nodes: Vec<EntityNode>,
    index: AHashMap<EntityId, u32>,
    stamp: u64,
}

impl EntityArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the arena contents with this tick's live entities.
    ///
    /// Known ids keep their node (and marks); new ids get fresh nodes;
    /// ids missing from `live` are removed. A repeated id keeps the last
    /// snapshot.
    pub fn sync(&mut self, live: &[Entity]) {
        self.stamp += 1;
        let stamp = self.stamp;

        for entity in live {
            if let Some(&slot) = self.index.get(&entity.id) {
                let node = &mut self.nodes[slot as usize];
                node.entity = *entity;
                node.stamp = stamp;
                node.host = None;
            } else {
                self.index.insert(entity.id, self.nodes.len() as u32);
                self.nodes.push(EntityNode {
                    entity: *entity,
                    marks: VisitMarks::default(),
                    host: None,
                    stamp,
                });
            }
        }

        let mut i = 0;
        while i < self.nodes.len() {
            if self.nodes[i].stamp == stamp {
                i += 1;
                continue;
            }
            let dead = self.nodes.swap_remove(i);
            self.index.remove(&dead.entity.id);
            if let Some(moved) = self.nodes.get(i) {
                self.index.insert(moved.entity.id, i as u32);
            }
        }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at an arena index.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&EntityNode> {
        self.nodes.get(index as usize)
    }

    /// Arena index of an entity.
    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<u32> {
        self.index.get(&id).copied()
    }

    /// All nodes, in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[EntityNode] {
        &self.nodes
    }

    /// Clears one camera's marks on every node.
    pub fn reset_marks(&mut self, camera: CameraId) {
        for node in &mut self.nodes {
            node.marks.reset(camera);
        }
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [EntityNode] {
        &mut self.nodes
    }
}
