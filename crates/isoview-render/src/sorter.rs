//! Topological depth ordering of the occlusion graph.
//!
//! The walk is a post-order depth-first traversal started from the root
//! frontier. A node is appended to the depth list only after everything it
//! covers has been appended, which yields a strict back-to-front order. The
//! traversal uses an explicit stack, so there is no recursion depth limit.
//!
//! Edges of the graph:
//!
//! | node   | entity-first                   | host-first                            |
//! |--------|--------------------------------|---------------------------------------|
//! | cell   | bound entities, covers, emit   | covers, emit, bound entities          |
//! | entity | host's covers, emit            | host, host's covers, emit             |

use isoview_common::{CameraId, Projection};
use tracing::debug;

use crate::binder::{sort_by_depth, EntityBinder};
use crate::config::HostTieBreak;
use crate::depth_list::DepthList;
use crate::entity::EntityArena;
use crate::frustum::FrustumCuller;
use crate::node::{DepthNode, NodeRef};
use crate::visit::FrameEpoch;
use crate::window::StreamingWindow;

/// Per-frame inputs of a walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkContext<'a> {
    /// Walking camera
    pub camera: CameraId,
    /// The camera's epoch for this frame
    pub epoch: FrameEpoch,
    /// Highest rendered z layer
    pub z_limit: Option<i32>,
    /// Visibility test
    pub culler: &'a FrustumCuller,
    /// Isometric projection
    pub projection: &'a Projection,
}

/// Diagnostics of one camera's frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Items in the depth list
    pub emitted: usize,
    /// Nodes dropped or left unwalked at capacity
    pub overflow: usize,
    /// Nodes reached while still being expanded
    pub revisits: usize,
    /// Entities drawn from the fallback list
    pub fallback: usize,
    /// Frontier roots the walk started from
    pub roots: usize,
}

impl FrameStats {
    /// Reads the counters of a finished depth list.
    #[must_use]
    pub fn from_list(list: &DepthList, fallback: usize, roots: usize) -> Self {
        Self {
            emitted: list.len(),
            overflow: list.overflow(),
            revisits: list.revisits(),
            fallback,
            roots,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeRef,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Child(NodeRef),
    Emit,
    Done,
}

/// Iterative post-order walker.
#[derive(Debug)]
pub struct DepthSorter {
    policy: HostTieBreak,
    stack: Vec<Frame>,
    late: Vec<u32>,
}

impl DepthSorter {
    /// Creates a sorter using the given entity / host cell order.
    #[must_use]
    pub fn new(policy: HostTieBreak) -> Self {
        Self {
            policy,
            stack: Vec::new(),
            late: Vec::new(),
        }
    }

    /// Entity / host cell order.
    #[must_use]
    pub const fn policy(&self) -> HostTieBreak {
        self.policy
    }

    /// Walks the graph from `roots` and fills `list` back to front.
    ///
    /// Afterwards the binder's fallback entities, plus bound entities whose
    /// host was never reached, are appended by scalar depth.
    pub fn walk(
        &mut self,
        window: &mut StreamingWindow,
        arena: &mut EntityArena,
        binder: &EntityBinder,
        roots: &[u32],
        ctx: &WalkContext<'_>,
        list: &mut DepthList,
    ) -> FrameStats {
        self.stack.clear();
        let mut walked = 0;

        for (n, &root) in roots.iter().enumerate() {
            if list.is_full() {
                let skipped = roots[n..]
                    .iter()
                    .filter(|&&r| self.is_pending_root(window, r, ctx))
                    .count();
                list.record_overflow(skipped);
                break;
            }
            if !self.is_pending_root(window, root, ctx) {
                continue;
            }
            walked += 1;
            self.enter(window, arena, NodeRef::Cell(root), ctx);
            self.drain(window, arena, ctx, list);
        }

        let fallback = self.append_late(arena, binder, ctx, list);
        if list.overflow() > 0 || list.revisits() > 0 {
            debug!(
                "Camera {} walk: {} emitted, {} overflow, {} revisits",
                ctx.camera.slot(),
                list.len(),
                list.overflow(),
                list.revisits()
            );
        }
        FrameStats::from_list(list, fallback, walked)
    }

    fn is_pending_root(&self, window: &StreamingWindow, root: u32, ctx: &WalkContext<'_>) -> bool {
        let Some(cell) = window.cell(root) else {
            return false;
        };
        if DepthNode::is_visited(cell, ctx.camera, ctx.epoch) {
            return false;
        }
        let p = DepthNode::projected(cell, ctx.projection);
        ctx.culler.visible(p.x, p.y)
    }

    fn drain(
        &mut self,
        window: &mut StreamingWindow,
        arena: &mut EntityArena,
        ctx: &WalkContext<'_>,
        list: &mut DepthList,
    ) {
        while let Some(frame) = self.stack.last_mut() {
            let node = frame.node;
            let cursor = frame.cursor;
            frame.cursor += 1;

            if list.is_full() {
                self.stack.pop();
                let dropped = with_node(window, arena, node, |n| {
                    if n.marks().is_finished(ctx.camera, ctx.epoch) {
                        return false;
                    }
                    n.marks_mut().mark_finished(ctx.camera, ctx.epoch);
                    n.is_render_eligible(ctx.z_limit) && n.draw_item(ctx.z_limit).is_some()
                });
                if dropped {
                    list.record_overflow(1);
                }
                continue;
            }

            match self.step(window, arena, node, cursor) {
                Step::Child(child) => self.descend(window, arena, child, ctx, list),
                Step::Emit => {
                    let item = with_node(window, arena, node, |n| {
                        n.marks_mut().mark_finished(ctx.camera, ctx.epoch);
                        if n.is_render_eligible(ctx.z_limit) {
                            n.draw_item(ctx.z_limit)
                        } else {
                            None
                        }
                    });
                    if let Some(item) = item {
                        list.push(item);
                    }
                },
                Step::Done => {
                    self.stack.pop();
                },
            }
        }
    }

    fn descend(
        &mut self,
        window: &mut StreamingWindow,
        arena: &mut EntityArena,
        child: NodeRef,
        ctx: &WalkContext<'_>,
        list: &mut DepthList,
    ) {
        let (visited, finished, visible) = match child {
            NodeRef::Cell(i) => {
                let Some(cell) = window.cell(i) else {
                    return;
                };
                let p = DepthNode::projected(cell, ctx.projection);
                (
                    cell.marks().is_visited(ctx.camera, ctx.epoch),
                    cell.marks().is_finished(ctx.camera, ctx.epoch),
                    ctx.culler.visible(p.x, p.y),
                )
            },
            NodeRef::Entity(i) => {
                let Some(node) = arena.get(i) else {
                    return;
                };
                (
                    node.marks().is_visited(ctx.camera, ctx.epoch),
                    node.marks().is_finished(ctx.camera, ctx.epoch),
                    true,
                )
            },
        };

        if visited {
            if !finished {
                list.record_revisit();
                debug!("Camera {} reached {child:?} while expanding it", ctx.camera.slot());
            }
            return;
        }
        if visible {
            self.enter(window, arena, child, ctx);
        }
    }

    fn enter(
        &mut self,
        window: &mut StreamingWindow,
        arena: &mut EntityArena,
        node: NodeRef,
        ctx: &WalkContext<'_>,
    ) {
        with_node(window, arena, node, |n| n.mark_visited(ctx.camera, ctx.epoch));
        self.stack.push(Frame { node, cursor: 0 });
    }

    /// The `cursor`-th step of a node under the tie-break policy.
    fn step(&self, window: &StreamingWindow, arena: &EntityArena, node: NodeRef, cursor: usize) -> Step {
        let cells = window.cells();
        match node {
            NodeRef::Cell(i) => {
                let Some(cell) = cells.get(i as usize) else {
                    return Step::Done;
                };
                let bound = cell.bound();
                let covers = cell.covers().as_slice();
                match self.policy {
                    HostTieBreak::EntityFirst => sequence(
                        cursor,
                        &[
                            Part::Entities(bound),
                            Part::Cells(covers),
                            Part::Emit,
                        ],
                    ),
                    HostTieBreak::HostFirst => sequence(
                        cursor,
                        &[
                            Part::Cells(covers),
                            Part::Emit,
                            Part::Entities(bound),
                        ],
                    ),
                }
            },
            NodeRef::Entity(i) => {
                let host = arena.get(i).and_then(|n| n.host());
                let host_cell = host.and_then(|h| cells.get(h as usize));
                let covers = host_cell.map_or(&[][..], |c| c.covers().as_slice());
                let host_slice = host.as_slice();
                match self.policy {
                    HostTieBreak::EntityFirst => {
                        sequence(cursor, &[Part::Cells(covers), Part::Emit])
                    },
                    HostTieBreak::HostFirst => sequence(
                        cursor,
                        &[
                            Part::Cells(host_slice),
                            Part::Cells(covers),
                            Part::Emit,
                        ],
                    ),
                }
            },
        }
    }

    fn append_late(
        &mut self,
        arena: &mut EntityArena,
        binder: &EntityBinder,
        ctx: &WalkContext<'_>,
        list: &mut DepthList,
    ) -> usize {
        self.late.clear();
        self.late.extend_from_slice(binder.fallback());
        for &slot in binder.bound() {
            let Some(node) = arena.get(slot) else {
                continue;
            };
            let orphaned = !node.marks().is_visited(ctx.camera, ctx.epoch);
            if orphaned {
                self.late.push(slot);
            }
        }
        if self.late.is_empty() {
            return 0;
        }
        sort_by_depth(&mut self.late, arena, ctx.projection);

        let mut appended = 0;
        let nodes = arena.nodes_mut();
        for &slot in &self.late {
            let Some(node) = nodes.get_mut(slot as usize) else {
                continue;
            };
            node.mark_visited(ctx.camera, ctx.epoch);
            node.marks_mut().mark_finished(ctx.camera, ctx.epoch);
            if let Some(item) = node.draw_item(ctx.z_limit) {
                if list.push(item) {
                    appended += 1;
                }
            }
        }
        appended
    }
}

enum Part<'a> {
    Entities(&'a [u32]),
    Cells(&'a [u32]),
    Emit,
}

fn sequence(mut cursor: usize, parts: &[Part<'_>]) -> Step {
    for part in parts {
        match part {
            Part::Entities(items) | Part::Cells(items) if cursor < items.len() => {
                return match part {
                    Part::Entities(_) => Step::Child(NodeRef::Entity(items[cursor])),
                    _ => Step::Child(NodeRef::Cell(items[cursor])),
                };
            },
            Part::Entities(items) | Part::Cells(items) => cursor -= items.len(),
            Part::Emit if cursor == 0 => return Step::Emit,
            Part::Emit => cursor -= 1,
        }
    }
    Step::Done
}

fn with_node<R>(
    window: &mut StreamingWindow,
    arena: &mut EntityArena,
    node: NodeRef,
    f: impl FnOnce(&mut dyn DepthNode) -> R,
) -> R
where
    R: Default,
{
    match node {
        NodeRef::Cell(i) => window
            .cells_mut()
            .get_mut(i as usize)
            .map_or_else(R::default, |cell| f(cell)),
        NodeRef::Entity(i) => arena
            .nodes_mut()
            .get_mut(i as usize)
            .map_or_else(R::default, |node| f(node)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth_list::{DrawItem, NodeKey};
    use crate::entity::Entity;
    use glam::Vec3;
    use isoview_common::{ChunkCoord, ChunkDims, EntityId, VoxelCoord};
    use isoview_world::{materials, Chunk, InMemoryStore, LoadMode, MaterialTable, Voxel};
    use std::sync::Arc;

    struct Fixture {
        window: StreamingWindow,
        arena: EntityArena,
        binder: EntityBinder,
        culler: FrustumCuller,
        projection: Projection,
        epoch: FrameEpoch,
    }

    impl Fixture {
        fn new(solids: &[(i32, i32, i32)]) -> Self {
            let dims = ChunkDims::new(4, 4, 4);
            let store = InMemoryStore::new(dims, |c: ChunkCoord, d: ChunkDims| Chunk::new(c, d), LoadMode::Immediate);
            for &(x, y, z) in solids {
                store.set_voxel(VoxelCoord::new(x, y, z), Voxel::new(materials::STONE));
            }
            let projection = Projection::default();
            let mut window =
                StreamingWindow::new(dims, projection, Arc::new(MaterialTable::default()), 10);
            window
                .ensure_loaded(&store, ChunkCoord::new(0, 0), 1)
                .expect("load");
            window
                .on_anchor_changed(&store, None, ChunkCoord::new(0, 0), 1)
                .expect("rebuild");
            Self {
                window,
                arena: EntityArena::new(),
                binder: EntityBinder::new(),
                culler: FrustumCuller::from_bounds(-1e6, -1e6, 1e6, 1e6, &projection),
                projection,
                epoch: FrameEpoch::START,
            }
        }

        fn walk(&mut self, policy: HostTieBreak, capacity: usize) -> DepthList {
            self.epoch.advance();
            let mut list = DepthList::new(capacity);
            let roots = self.window.root_frontier(None);
            self.binder
                .bind(&mut self.window, &mut self.arena, &self.culler, None);
            let ctx = WalkContext {
                camera: CameraId::PRIMARY,
                epoch: self.epoch,
                z_limit: None,
                culler: &self.culler,
                projection: &self.projection,
            };
            DepthSorter::new(policy).walk(
                &mut self.window,
                &mut self.arena,
                &self.binder,
                &roots,
                &ctx,
                &mut list,
            );
            self.binder.clear(&mut self.window, &mut self.arena);
            list
        }
    }

    fn cell_key(x: i32, y: i32, z: i32) -> NodeKey {
        NodeKey::Cell(VoxelCoord::new(x, y, z))
    }

    #[test]
    fn test_single_cell_emitted_once() {
        let mut fx = Fixture::new(&[(0, 0, 0)]);
        let list = fx.walk(HostTieBreak::EntityFirst, 100);
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].key(), cell_key(0, 0, 0));
    }

    #[test]
    fn test_stacked_cells_bottom_first() {
        let mut fx = Fixture::new(&[(0, 0, 0), (0, 0, 1)]);
        let list = fx.walk(HostTieBreak::EntityFirst, 100);
        let low = list.position_of(cell_key(0, 0, 0)).expect("low");
        let high = list.position_of(cell_key(0, 0, 1)).expect("high");
        assert!(low < high);
    }

    #[test]
    fn test_entity_between_covered_and_host() {
        // Host (1, 1, 1) sits on (1, 1, 0) and covers it; the entity stands
        // inside the host cell.
        let mut fx = Fixture::new(&[(1, 1, 0), (1, 1, 1)]);
        fx.arena.sync(&[Entity::new(EntityId::from_raw(7), Vec3::new(1.5, 1.5, 1.2))]);

        let list = fx.walk(HostTieBreak::EntityFirst, 100);
        let below = list.position_of(cell_key(1, 1, 0)).expect("below");
        let entity = list
            .position_of(NodeKey::Entity(EntityId::from_raw(7)))
            .expect("entity");
        let host = list.position_of(cell_key(1, 1, 1)).expect("host");
        assert!(below < entity && entity < host);
    }

    #[test]
    fn test_host_first_policy() {
        let mut fx = Fixture::new(&[(1, 1, 0), (1, 1, 1)]);
        fx.arena.sync(&[Entity::new(EntityId::from_raw(7), Vec3::new(1.5, 1.5, 1.2))]);

        let list = fx.walk(HostTieBreak::HostFirst, 100);
        let below = list.position_of(cell_key(1, 1, 0)).expect("below");
        let entity = list
            .position_of(NodeKey::Entity(EntityId::from_raw(7)))
            .expect("entity");
        let host = list.position_of(cell_key(1, 1, 1)).expect("host");
        assert!(below < host && host < entity);
        assert_eq!(list.revisits(), 0);
    }

    #[test]
    fn test_capacity_truncates_and_counts() {
        let solids: Vec<_> = (0..4).flat_map(|x| (0..4).map(move |y| (x, y, 0))).collect();
        let mut fx = Fixture::new(&solids);
        let list = fx.walk(HostTieBreak::EntityFirst, 5);
        assert_eq!(list.len(), 5);
        assert!(list.overflow() > 0);
    }

    #[test]
    fn test_fallback_entities_appended_by_depth() {
        let mut fx = Fixture::new(&[(0, 0, 0)]);
        fx.arena.sync(&[
            Entity::new(EntityId::from_raw(1), Vec3::new(50.0, 50.0, 0.0)),
            Entity::new(EntityId::from_raw(2), Vec3::new(40.0, 40.0, 0.0)),
        ]);
        let list = fx.walk(HostTieBreak::EntityFirst, 100);
        let keys: Vec<_> = list.iter().map(DrawItem::key).collect();
        assert_eq!(
            keys,
            vec![
                cell_key(0, 0, 0),
                NodeKey::Entity(EntityId::from_raw(2)),
                NodeKey::Entity(EntityId::from_raw(1)),
            ]
        );
    }

    #[test]
    fn test_misassigned_entity_counts_revisit() {
        // The entity sits in the bound list of (1, 1, 0) but claims the cell in
        // front of it, (2, 1, 0), as host. Expanding the front cell reaches the
        // back cell, whose entity then leads straight back to it.
        let mut fx = Fixture::new(&[(1, 1, 0), (2, 1, 0)]);
        fx.arena.sync(&[Entity::new(EntityId::from_raw(9), Vec3::new(1.5, 1.5, 0.5))]);

        fx.epoch.advance();
        let back = fx.window.index_of(VoxelCoord::new(1, 1, 0)).expect("back");
        let front = fx.window.index_of(VoxelCoord::new(2, 1, 0)).expect("front");
        fx.window.cells_mut()[back as usize].bound_mut().push(0);
        fx.arena.nodes_mut()[0].set_host(Some(front));

        let roots = fx.window.root_frontier(None);
        let ctx = WalkContext {
            camera: CameraId::PRIMARY,
            epoch: fx.epoch,
            z_limit: None,
            culler: &fx.culler,
            projection: &fx.projection,
        };
        let mut list = DepthList::new(100);
        DepthSorter::new(HostTieBreak::EntityFirst).walk(
            &mut fx.window,
            &mut fx.arena,
            &fx.binder,
            &roots,
            &ctx,
            &mut list,
        );

        assert!(list.revisits() >= 1);
        let mut keys: Vec<_> = list.iter().map(DrawItem::key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert!(list.position_of(cell_key(1, 1, 0)).is_some());
        assert!(list.position_of(cell_key(2, 1, 0)).is_some());
    }

    #[test]
    fn test_sequence_steps() {
        let bound = [4, 5];
        let covers = [9];
        let parts = [Part::Entities(&bound), Part::Cells(&covers), Part::Emit];
        assert_eq!(sequence(0, &parts), Step::Child(NodeRef::Entity(4)));
        assert_eq!(sequence(1, &parts), Step::Child(NodeRef::Entity(5)));
        assert_eq!(sequence(2, &parts), Step::Child(NodeRef::Cell(9)));
        assert_eq!(sequence(3, &parts), Step::Emit);
        assert_eq!(sequence(4, &parts), Step::Done);
    }
}
