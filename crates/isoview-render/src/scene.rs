//! Per-tick orchestration of streaming, binding and ordering.
//!
//! A [`Scene`] owns the streaming window, the entity arena and up to
//! [`MAX_CAMERAS`] cameras. Every [`Scene::tick`]:
//!
//! 1. applies pending store events,
//! 2. recomputes each camera's anchor and requests the chunks around it,
//! 3. rebuilds the window if the anchor or radius needed to hold every
//!    camera's view changed,
//! 4. syncs the entity arena with the live entity set,
//! 5. walks every camera in turn, leaving one finished depth list per camera.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use isoview_common::{CameraId, ChunkCoord, ChunkDims, Projection, WindowError, MAX_CAMERAS};
use isoview_world::{ChunkEvent, SpriteLookup, VoxelStore};
use tracing::{debug, info, warn};

use crate::binder::EntityBinder;
use crate::camera::Camera;
use crate::config::{RenderConfig, SortStrategy};
use crate::entity::{EntityArena, EntitySource};
use crate::frustum::FrustumCuller;
use crate::scalar::{sort_scalar, sort_unordered};
use crate::sorter::{DepthSorter, FrameStats, WalkContext};
use crate::window::{RebuildKind, StreamingWindow};

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Window rebuild performed this tick
    pub rebuild: Option<RebuildKind>,
    /// Set when a needed rebuild failed and the previous window was kept
    pub stale_window: Option<WindowError>,
    /// Set when the cameras' views did not fit `max_window_radius`; the
    /// window then covers the primary view as far as the limit allows
    pub clipped_views: Option<WindowError>,
    /// Chunk load requests issued
    pub load_requests: usize,
    /// Store events that changed the window
    pub chunk_events: usize,
    /// Per-camera diagnostics, in camera order
    pub frames: Vec<(CameraId, FrameStats)>,
}

/// The visibility and render-order engine for one world.
pub struct Scene {
    config: RenderConfig,
    store: Arc<dyn VoxelStore>,
    events: Receiver<ChunkEvent>,
    window: StreamingWindow,
    arena: EntityArena,
    binder: EntityBinder,
    sorter: DepthSorter,
    cameras: Vec<Camera>,
    tick: u64,
}

impl Scene {
    /// Creates a scene over a store, drawing sprites from `lookup`.
    ///
    /// Chunk dimensions come from the store.
    pub fn new<S, L>(mut config: RenderConfig, store: Arc<S>, lookup: Arc<L>) -> Self
    where
        S: VoxelStore + 'static,
        L: SpriteLookup + 'static,
    {
        config.validate();
        let dims = store.dims();
        if dims != config.chunk_dims {
            debug!(
                "Store chunk dims {}x{}x{} override configured {}x{}x{}",
                dims.width,
                dims.depth,
                dims.height,
                config.chunk_dims.width,
                config.chunk_dims.depth,
                config.chunk_dims.height
            );
            config.chunk_dims = dims;
        }

        let events = store.subscribe();
        let window = StreamingWindow::new(dims, config.projection, lookup, config.pending_retry_ticks);
        info!(
            "Scene created: {:?} ordering, {:?}, cap {} objects",
            config.sort_strategy, config.host_tie_break, config.max_rendered_objects
        );

        Self {
            sorter: DepthSorter::new(config.host_tie_break),
            config,
            store,
            events,
            window,
            arena: EntityArena::new(),
            binder: EntityBinder::new(),
            cameras: Vec::new(),
            tick: 0,
        }
    }

    /// Adds a camera. Returns `None` once [`MAX_CAMERAS`] are in use.
    pub fn add_camera(&mut self, viewport_width: u32, viewport_height: u32) -> Option<CameraId> {
        if self.cameras.len() >= MAX_CAMERAS {
            warn!("Camera limit of {MAX_CAMERAS} reached");
            return None;
        }
        let id = CameraId::new(self.cameras.len() as u8)?;
        self.cameras
            .push(Camera::new(id, viewport_width, viewport_height, &self.config));
        Some(id)
    }

    /// A camera by id.
    #[must_use]
    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(id.slot())
    }

    /// A camera by id, mutably.
    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(id.slot())
    }

    /// All cameras in id order.
    #[must_use]
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// The streaming window.
    #[must_use]
    pub const fn window(&self) -> &StreamingWindow {
        &self.window
    }

    /// The entity arena.
    #[must_use]
    pub const fn arena(&self) -> &EntityArena {
        &self.arena
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Runs one frame for every camera.
    pub fn tick<E>(&mut self, entities: &E) -> TickReport
    where
        E: EntitySource + ?Sized,
    {
        self.tick += 1;
        self.window.advance_tick();
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        report.chunk_events += self.drain_events();
        self.stream(&mut report);
        report.chunk_events += self.drain_events();

        self.arena.sync(&entities.live_entities());
        self.walk_cameras(&mut report);
        report
    }

    fn drain_events(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.window.on_chunk_event(self.store.as_ref(), event) {
                changed += 1;
            }
        }
        changed
    }

    fn stream(&mut self, report: &mut TickReport) {
        let projection = self.config.projection;
        let dims = self.window.dims();
        let mut load_squares = Vec::with_capacity(self.cameras.len());

        for camera in &mut self.cameras {
            let anchor = self.window.recompute_anchor(camera.position);
            camera.set_anchor(anchor);

            let required = camera.required_radius(anchor, &projection, dims);
            let view_radius = required
                .max(self.config.loading_radius)
                .min(self.config.max_window_radius);
            let load_radius = camera.loading_radius().current().max(view_radius);

            match self
                .window
                .ensure_loaded(self.store.as_ref(), anchor, load_radius)
            {
                Ok(requested) => {
                    report.load_requests += requested;
                    camera.mark_filled();
                },
                Err(e) => warn!("Chunk requests for camera {} failed: {e}", camera.id().slot()),
            }
            load_squares.push((anchor, load_radius));
        }
        self.window.prune_pending(&load_squares);

        let Some((anchor, radius)) = self.window_target(report) else {
            return;
        };
        let current = self.window.anchor();
        if current == Some(anchor) && self.window.radius() == Some(radius) {
            return;
        }
        match self
            .window
            .on_anchor_changed(self.store.as_ref(), current, anchor, radius)
        {
            Ok(kind) => report.rebuild = Some(kind),
            Err(e) => {
                warn!("Keeping previous window: {e}");
                report.stale_window = Some(e);
            },
        }
    }

    /// Anchor and radius of a window holding every camera's view.
    ///
    /// The primary anchor is kept while all views fit around it. Otherwise
    /// the window centers on the chunk box of all views. When even that exceeds `max_window_radius`, the window
    /// falls back to the primary view and the overflow is reported.
    fn window_target(&self, report: &mut TickReport) -> Option<(ChunkCoord, u32)> {
        let projection = self.config.projection;
        let dims = self.window.dims();
        let max = self.config.max_window_radius;
        let primary = self.cameras.first()?;
        let primary_anchor = primary.anchor()?;

        let union_radius = |anchor: ChunkCoord| {
            self.cameras
                .iter()
                .map(|c| c.required_radius(anchor, &projection, dims))
                .max()
                .unwrap_or(0)
        };

        let mut anchor = primary_anchor;
        let mut required = union_radius(anchor);
        if required > max && self.cameras.len() > 1 {
            let center = self.view_box_center(&projection, dims);
            let centered = union_radius(center);
            if centered < required {
                anchor = center;
                required = centered;
            }
        }

        if required > max {
            debug!("Camera views need window radius {required}, capped at {max}");
            report.clipped_views = Some(WindowError::ViewsTooWide { required, max });
            anchor = primary_anchor;
            required = primary.required_radius(anchor, &projection, dims);
        }
        Some((anchor, required.max(self.config.loading_radius).min(max)))
    }

    /// Center chunk of the box spanned by every camera's visible cells.
    fn view_box_center(&self, projection: &Projection, dims: ChunkDims) -> ChunkCoord {
        let mut low = ChunkCoord::new(i32::MAX, i32::MAX);
        let mut high = ChunkCoord::new(i32::MIN, i32::MIN);
        for camera in &self.cameras {
            let (min, max) = camera.visible_cell_rect(projection, dims);
            let (min, max) = (min.to_chunk_coord(dims), max.to_chunk_coord(dims));
            low = ChunkCoord::new(low.x.min(min.x), low.y.min(min.y));
            high = ChunkCoord::new(high.x.max(max.x), high.y.max(max.y));
        }
        ChunkCoord::new(
            low.x + (high.x - low.x).div_euclid(2),
            low.y + (high.y - low.y).div_euclid(2),
        )
    }

    fn walk_cameras(&mut self, report: &mut TickReport) {
        let Self {
            config,
            window,
            arena,
            binder,
            sorter,
            cameras,
            ..
        } = self;
        let projection = config.projection;

        for camera in cameras.iter_mut() {
            let id = camera.id();
            if camera.advance_epoch() {
                debug!("Camera {} epoch wrapped, resetting marks", id.slot());
                window.reset_marks(id);
                arena.reset_marks(id);
            }
            camera.refresh_frontier(window);

            let culler = FrustumCuller::from_camera(camera, &projection);
            let ctx = WalkContext {
                camera: id,
                epoch: camera.epoch(),
                z_limit: camera.z_limit(),
                culler: &culler,
                projection: &projection,
            };

            binder.bind(window, arena, &culler, ctx.z_limit);
            let (roots, list) = camera.frontier_and_list_mut();
            list.clear();
            let stats = match config.sort_strategy {
                SortStrategy::Topological => sorter.walk(window, arena, binder, roots, &ctx, list),
                SortStrategy::Scalar => sort_scalar(window, arena, binder, &ctx, list),
                SortStrategy::None => sort_unordered(window, arena, binder, &ctx, list),
            };
            binder.clear(window, arena);

            report.frames.push((id, stats));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use isoview_common::{ChunkDims, EntityId};
    use isoview_world::{EmptySource, InMemoryStore, LoadMode, MaterialTable, WorldGenerator};

    fn scene(config: RenderConfig) -> (Arc<InMemoryStore>, Scene) {
        let store = Arc::new(InMemoryStore::new(
            ChunkDims::new(8, 8, 16),
            WorldGenerator::with_seed(1),
            LoadMode::Immediate,
        ));
        let scene = Scene::new(config, Arc::clone(&store), Arc::new(MaterialTable::default()));
        (store, scene)
    }

    #[test]
    fn test_camera_limit() {
        let (_store, mut scene) = scene(RenderConfig::default());
        for _ in 0..MAX_CAMERAS {
            assert!(scene.add_camera(320, 240).is_some());
        }
        assert!(scene.add_camera(320, 240).is_none());
    }

    #[test]
    fn test_first_tick_builds_window() {
        let (_store, mut scene) = scene(RenderConfig::default());
        scene.add_camera(320, 240);
        let report = scene.tick(&Vec::<Entity>::new());
        assert_eq!(report.tick, 1);
        assert_eq!(report.rebuild, Some(RebuildKind::Full));
        assert!(report.load_requests > 0);
        assert_eq!(report.frames.len(), 1);
        assert!(report.frames[0].1.emitted > 0);

        let second = scene.tick(&Vec::<Entity>::new());
        assert!(second.rebuild.is_none());
        assert_eq!(second.load_requests, 0);
    }

    #[test]
    fn test_far_move_drops_stale_requests() {
        let store = Arc::new(InMemoryStore::new(
            ChunkDims::new(8, 8, 16),
            EmptySource,
            LoadMode::Deferred,
        ));
        let config = RenderConfig {
            loading_radius: 1,
            initial_loading_radius: 1,
            max_window_radius: 1,
            ..RenderConfig::default()
        };
        let mut scene = Scene::new(config, Arc::clone(&store), Arc::new(MaterialTable::default()));
        let id = scene.add_camera(320, 240).expect("camera");

        let first = scene.tick(&Vec::<Entity>::new());
        assert_eq!(first.load_requests, 9);
        assert_eq!(scene.window().pending_count(), 9);

        // None of the first requests ever complete.
        let projection = scene.config().projection;
        scene
            .camera_mut(id)
            .expect("camera")
            .focus_on(glam::Vec3::new(400.5, 400.5, 0.0), &projection);
        let moved = scene.tick(&Vec::<Entity>::new());
        assert_eq!(moved.load_requests, 9);
        assert_eq!(scene.window().pending_count(), 9);
    }

    #[test]
    fn test_strategies_emit_same_node_set() {
        let mut sets = Vec::new();
        for strategy in [SortStrategy::Topological, SortStrategy::Scalar, SortStrategy::None] {
            let config = RenderConfig {
                sort_strategy: strategy,
                ..RenderConfig::default()
            };
            let (_store, mut scene) = scene(config);
            let id = scene.add_camera(320, 240).expect("camera");
            let entities = vec![Entity::new(EntityId::from_raw(5), glam::Vec3::new(2.5, 2.5, 12.0))];
            scene.tick(&entities);
            let mut keys: Vec<_> = scene
                .camera(id)
                .expect("camera")
                .depth_list()
                .iter()
                .map(crate::depth_list::DrawItem::key)
                .collect();
            keys.sort();
            sets.push(keys);
        }
        assert_eq!(sets[0], sets[1]);
        assert_eq!(sets[0], sets[2]);
    }
}
