//! Camera-anchored streaming window over the voxel store.
//!
//! The window mirrors a square of `(2r + 1)²` chunk columns around an anchor
//! chunk as a dense array of [`RenderCell`]s. It requests loads for chunks
//! around each camera, rebuilds itself when the anchor moves (shifting
//! incrementally for single-chunk moves), and rewraps chunks in place when the
//! store reports a load or change. Every structural change bumps the window
//! generation, which invalidates cached root frontiers.

use std::sync::Arc;

use ahash::AHashMap;
use isoview_common::{
    CameraId, ChunkCoord, ChunkDims, LocalCoord, Projection, StoreError, VoxelCoord, WindowError,
};
use isoview_world::{Chunk, ChunkEvent, SpriteLookup, VoxelStore};
use tracing::{debug, info, trace};

use crate::cell::{ClipFlags, CoverSet, RenderCell};

/// How the window was rebuilt for a new anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildKind {
    /// Cells of chunks that stayed inside the window were moved over
    Shift {
        /// Number of chunk columns carried over
        reused: usize,
    },
    /// Every chunk was rewrapped
    Full,
}

/// Placement of the window in grid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Center chunk
    pub anchor: ChunkCoord,
    /// Chebyshev radius in chunks
    pub radius: u32,
    /// Lowest voxel corner
    pub origin: VoxelCoord,
    /// Extent in voxels (x, y, z)
    pub size: (u32, u32, u32),
}

impl Layout {
    /// Computes the layout of a window centered on `anchor`.
    #[must_use]
    pub fn new(anchor: ChunkCoord, radius: u32, dims: ChunkDims) -> Self {
        let span = 2 * radius + 1;
        let r = radius as i32;
        Self {
            anchor,
            radius,
            origin: anchor.offset(-r, -r).origin(dims),
            size: (span * dims.width, span * dims.depth, dims.height),
        }
    }

    /// Chunks per side.
    #[must_use]
    pub const fn span(&self) -> u32 {
        2 * self.radius + 1
    }

    /// Number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        (self.size.0 as usize) * (self.size.1 as usize) * (self.size.2 as usize)
    }

    /// Number of chunk slots.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        (self.span() as usize) * (self.span() as usize)
    }

    /// Cell index of a grid coordinate, `None` outside the window.
    #[must_use]
    pub fn index(&self, coord: VoxelCoord) -> Option<usize> {
        let dx = coord.x - self.origin.x;
        let dy = coord.y - self.origin.y;
        let dz = coord.z - self.origin.z;
        let (sx, sy, sz) = (self.size.0 as i32, self.size.1 as i32, self.size.2 as i32);
        if dx < 0 || dy < 0 || dz < 0 || dx >= sx || dy >= sy || dz >= sz {
            return None;
        }
        Some(((dz * sy + dy) * sx + dx) as usize)
    }

    /// Grid coordinate of a cell index.
    #[must_use]
    pub fn coord(&self, index: usize) -> VoxelCoord {
        let sx = self.size.0 as usize;
        let sy = self.size.1 as usize;
        self.origin.offset(
            (index % sx) as i32,
            ((index / sx) % sy) as i32,
            (index / (sx * sy)) as i32,
        )
    }

    /// Slot of a chunk, `None` outside the window.
    #[must_use]
    pub fn slot(&self, chunk: ChunkCoord) -> Option<usize> {
        let r = self.radius as i32;
        let dx = chunk.x - self.anchor.x + r;
        let dy = chunk.y - self.anchor.y + r;
        let span = self.span() as i32;
        if dx < 0 || dy < 0 || dx >= span || dy >= span {
            return None;
        }
        Some((dy * span + dx) as usize)
    }

    /// Chunks in slot order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkCoord> {
        self.anchor.square(self.radius)
    }

    /// Highest voxel corner (inclusive).
    #[must_use]
    pub fn max_corner(&self) -> VoxelCoord {
        self.origin.offset(
            self.size.0 as i32 - 1,
            self.size.1 as i32 - 1,
            self.size.2 as i32 - 1,
        )
    }
}

/// Generates chunks in spiral order from center outward.
#[must_use]
pub fn spiral_chunks(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
    let mut result = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);

    result.push(center);

    for ring in 1..=radius as i32 {
        // Top edge (left to right, excluding right corner)
        for x in -ring..ring {
            result.push(center.offset(x, ring));
        }
        // Right edge (top to bottom, excluding bottom corner)
        for y in (-ring..ring).rev() {
            result.push(center.offset(ring, y + 1));
        }
        // Bottom edge (right to left, excluding left corner)
        for x in (-ring..ring).rev() {
            result.push(center.offset(x + 1, -ring));
        }
        // Left edge (bottom to top, excluding top corner)
        for y in -ring..ring {
            result.push(center.offset(-ring, y));
        }
    }

    result
}

/// Bounded buffer of render cells around the anchor chunk.
pub struct StreamingWindow {
    /// Chunk column dimensions
    dims: ChunkDims,
    /// Isometric projection
    projection: Projection,
    /// Material → sprite lookup
    lookup: Arc<dyn SpriteLookup>,
    /// Current placement, `None` before the first build
    layout: Option<Layout>,
    /// Dense cell array indexed by [`Layout::index`]
    cells: Vec<RenderCell>,
    /// Wrapped chunk per slot
    slots: Vec<Option<Arc<Chunk>>>,
    /// Bumped on every structural change
    generation: u64,
    /// Outstanding load requests and the tick they were made
    pending: AHashMap<ChunkCoord, u64>,
    /// Streaming clock
    tick: u64,
    /// Ticks before re-requesting a pending chunk
    retry_ticks: u64,
}

impl StreamingWindow {
    /// Creates an empty, unbuilt window.
    #[must_use]
    pub fn new(
        dims: ChunkDims,
        projection: Projection,
        lookup: Arc<dyn SpriteLookup>,
        retry_ticks: u64,
    ) -> Self {
        Self {
            dims,
            projection,
            lookup,
            layout: None,
            cells: Vec::new(),
            slots: Vec::new(),
            generation: 0,
            pending: AHashMap::new(),
            tick: 0,
            retry_ticks: retry_ticks.max(1),
        }
    }

    /// Chunk column dimensions.
    #[must_use]
    pub const fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Isometric projection.
    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Current placement.
    #[must_use]
    pub const fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Current anchor chunk.
    #[must_use]
    pub fn anchor(&self) -> Option<ChunkCoord> {
        self.layout.map(|l| l.anchor)
    }

    /// Current radius in chunks.
    #[must_use]
    pub fn radius(&self) -> Option<u32> {
        self.layout.map(|l| l.radius)
    }

    /// Structural generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of chunks with an outstanding load request.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a chunk is wrapped inside the window.
    #[must_use]
    pub fn holds_chunk(&self, chunk: ChunkCoord) -> bool {
        self.layout
            .and_then(|l| l.slot(chunk))
            .and_then(|slot| self.slots.get(slot))
            .is_some_and(Option::is_some)
    }

    /// Anchor chunk for a camera's projected position: the camera point is
    /// un-projected onto the ground plane and floor-divided by the chunk
    /// footprint.
    #[must_use]
    pub fn recompute_anchor(&self, position: (f32, f32)) -> ChunkCoord {
        let ground = self
            .projection
            .unproject(glam::Vec2::new(position.0, position.1), 0.0);
        VoxelCoord::from_point(ground).to_chunk_coord(self.dims)
    }

    /// Advances the streaming clock by one tick.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Requests every chunk within `radius` of `anchor` that is neither
    /// resident nor waiting on a recent request. Returns the number of
    /// requests issued.
    pub fn ensure_loaded(
        &mut self,
        store: &dyn VoxelStore,
        anchor: ChunkCoord,
        radius: u32,
    ) -> Result<usize, StoreError> {
        let mut requested = 0;
        for chunk in spiral_chunks(anchor, radius) {
            if self.holds_chunk(chunk) || store.get_chunk(chunk).is_some() {
                self.pending.remove(&chunk);
                continue;
            }
            if let Some(&at) = self.pending.get(&chunk) {
                if self.tick.saturating_sub(at) < self.retry_ticks {
                    continue;
                }
                trace!("Retrying load of chunk ({}, {})", chunk.x, chunk.y);
            }
            store.request_load(chunk)?;
            self.pending.insert(chunk, self.tick);
            requested += 1;
        }
        if requested > 0 {
            debug!(
                "Requested {requested} chunk loads around ({}, {}) radius {radius}",
                anchor.x, anchor.y
            );
        }
        Ok(requested)
    }

    /// Forgets outstanding requests for chunks outside every
    /// `(anchor, radius)` load square. Returns the number dropped.
    pub fn prune_pending(&mut self, squares: &[(ChunkCoord, u32)]) -> usize {
        let before = self.pending.len();
        self.pending.retain(|&chunk, _| {
            squares
                .iter()
                .any(|&(anchor, radius)| anchor.chebyshev_distance(chunk) <= radius)
        });
        let dropped = before - self.pending.len();
        if dropped > 0 {
            trace!("Dropped {dropped} load requests outside every load square");
        }
        dropped
    }

    /// Rebuilds the window for a new anchor.
    ///
    /// A move of at most one chunk per axis with an unchanged radius shifts
    /// the existing cells; anything else rewraps every chunk, which needs an
    /// available store. On error the previous window stays intact.
    pub fn on_anchor_changed(
        &mut self,
        store: &dyn VoxelStore,
        old: Option<ChunkCoord>,
        new: ChunkCoord,
        radius: u32,
    ) -> Result<RebuildKind, WindowError> {
        let shiftable = match (self.layout, old) {
            (Some(layout), Some(old)) => {
                layout.anchor == old && layout.radius == radius && old.chebyshev_distance(new) <= 1
            },
            _ => false,
        };

        let kind = if shiftable {
            self.shift(store, new)
        } else {
            self.rebuild_full(store, new, radius)?
        };

        if let Some(layout) = self.layout {
            self.refresh_region(layout.origin, layout.max_corner());
        }
        self.generation += 1;
        Ok(kind)
    }

    fn rebuild_full(
        &mut self,
        store: &dyn VoxelStore,
        anchor: ChunkCoord,
        radius: u32,
    ) -> Result<RebuildKind, WindowError> {
        if !store.is_available() {
            return Err(WindowError::StoreUnavailable {
                x: anchor.x,
                y: anchor.y,
            });
        }

        let layout = Layout::new(anchor, radius, self.dims);
        self.cells = (0..layout.cell_count())
            .map(|i| RenderCell::absent(layout.coord(i)))
            .collect();
        self.slots = vec![None; layout.slot_count()];
        self.layout = Some(layout);

        let mut resident = 0;
        for (slot, chunk) in layout.chunks().enumerate() {
            let data = store.get_chunk(chunk);
            if data.is_some() {
                resident += 1;
            }
            self.wrap_chunk(layout, chunk, data.as_deref());
            self.slots[slot] = data;
        }

        info!(
            "Window rebuilt at ({}, {}) radius {radius}: {resident}/{} chunks resident",
            anchor.x,
            anchor.y,
            layout.slot_count()
        );
        Ok(RebuildKind::Full)
    }

    fn shift(&mut self, store: &dyn VoxelStore, anchor: ChunkCoord) -> RebuildKind {
        let Some(old) = self.layout else {
            return RebuildKind::Shift { reused: 0 };
        };
        let layout = Layout::new(anchor, old.radius, self.dims);

        let mut old_cells = std::mem::take(&mut self.cells);
        let mut old_slots = std::mem::take(&mut self.slots);

        self.cells = (0..layout.cell_count())
            .map(|i| {
                let coord = layout.coord(i);
                match old.index(coord) {
                    Some(from) => std::mem::replace(&mut old_cells[from], RenderCell::absent(coord)),
                    None => RenderCell::absent(coord),
                }
            })
            .collect();
        self.slots = vec![None; layout.slot_count()];
        self.layout = Some(layout);

        let mut reused = 0;
        for (slot, chunk) in layout.chunks().enumerate() {
            if let Some(from) = old.slot(chunk) {
                self.slots[slot] = old_slots[from].take();
                reused += 1;
            } else {
                let data = store.get_chunk(chunk);
                self.wrap_chunk(layout, chunk, data.as_deref());
                self.slots[slot] = data;
            }
        }

        debug!(
            "Window shifted to ({}, {}): reused {reused}/{} chunks",
            anchor.x,
            anchor.y,
            layout.slot_count()
        );
        RebuildKind::Shift { reused }
    }

    /// Applies a store event. Returns true when the window changed.
    pub fn on_chunk_event(&mut self, store: &dyn VoxelStore, event: ChunkEvent) -> bool {
        let coord = event.coord();
        if matches!(event, ChunkEvent::Loaded(_)) {
            self.pending.remove(&coord);
        }
        let Some(layout) = self.layout else {
            return false;
        };
        let Some(slot) = layout.slot(coord) else {
            return false;
        };

        let fresh = match event {
            ChunkEvent::Unloaded(_) => None,
            ChunkEvent::Loaded(_) | ChunkEvent::Changed(_) => store.get_chunk(coord),
        };
        let unchanged = match (&self.slots[slot], &fresh) {
            (Some(held), Some(fresh)) => Arc::ptr_eq(held, fresh),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.wrap_chunk(layout, coord, fresh.as_deref());
        self.slots[slot] = fresh;

        let origin = coord.origin(self.dims);
        let far = origin.offset(
            self.dims.width as i32,
            self.dims.depth as i32,
            self.dims.height as i32 - 1,
        );
        self.refresh_region(origin.offset(-1, -1, 0), far);
        self.generation += 1;
        trace!("Rewrapped chunk ({}, {}) after {event:?}", coord.x, coord.y);
        true
    }

    fn wrap_chunk(&mut self, layout: Layout, chunk: ChunkCoord, data: Option<&Chunk>) {
        let origin = chunk.origin(self.dims);
        for z in 0..self.dims.height {
            for y in 0..self.dims.depth {
                for x in 0..self.dims.width {
                    let coord = origin.offset(x as i32, y as i32, z as i32);
                    let Some(index) = layout.index(coord) else {
                        continue;
                    };
                    self.cells[index] = match data {
                        Some(chunk) => {
                            let voxel = chunk.get(LocalCoord::new(x as u16, y as u16, z as u16));
                            RenderCell::wrap(coord, voxel.material, self.lookup.material(voxel.material))
                        },
                        None => RenderCell::absent(coord),
                    };
                }
            }
        }
    }

    /// Recomputes clip flags and covered sets of every cell in the inclusive
    /// box `min..=max` (clamped to the window).
    pub fn refresh_region(&mut self, min: VoxelCoord, max: VoxelCoord) {
        let Some(layout) = self.layout else {
            return;
        };
        let low = layout.origin;
        let high = layout.max_corner();
        for z in min.z.max(low.z)..=max.z.min(high.z) {
            for y in min.y.max(low.y)..=max.y.min(high.y) {
                for x in min.x.max(low.x)..=max.x.min(high.x) {
                    let coord = VoxelCoord::new(x, y, z);
                    let Some(index) = layout.index(coord) else {
                        continue;
                    };
                    let (clip, covers) = self.links(&layout, index);
                    self.cells[index].set_links(clip, covers);
                }
            }
        }
    }

    fn links(&self, layout: &Layout, index: usize) -> (u8, CoverSet) {
        let cell = &self.cells[index];
        let mut covers = CoverSet::default();
        if !cell.is_present() {
            return (0, covers);
        }
        let coord = cell.coord();
        let present = |c: VoxelCoord| {
            layout
                .index(c)
                .filter(|&i| self.cells[i].is_present())
        };

        let mut clip = 0;
        for (neighbor, flag) in [
            (coord.offset(1, 0, 0), ClipFlags::RIGHT),
            (coord.offset(0, 1, 0), ClipFlags::LEFT),
            (coord.offset(0, 0, 1), ClipFlags::TOP),
        ] {
            if present(neighbor).is_some_and(|i| self.cells[i].is_opaque()) {
                clip |= flag;
            }
        }

        for neighbor in [
            coord.offset(-1, 0, 0),
            coord.offset(0, -1, 0),
            coord.offset(0, 0, -1),
        ] {
            if let Some(i) = present(neighbor) {
                covers.push(i as u32);
            }
        }
        (clip, covers)
    }

    /// Window cells that start the depth walk: present cells at or below
    /// the z limit with at least one missing front neighbor (outside the
    /// window, absent, or above the limit). Sorted back to front by scalar
    /// depth, then index.
    #[must_use]
    pub fn root_frontier(&self, z_limit: Option<i32>) -> Vec<u32> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };
        let above = |z: i32| z_limit.is_some_and(|limit| z > limit);
        let missing = |c: VoxelCoord| {
            above(c.z)
                || !layout
                    .index(c)
                    .is_some_and(|i| self.cells[i].is_present())
        };

        let mut roots: Vec<(f32, u32)> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_present() && !above(cell.coord().z))
            .filter(|(_, cell)| {
                let c = cell.coord();
                missing(c.offset(1, 0, 0)) || missing(c.offset(0, 1, 0)) || missing(c.offset(0, 0, 1))
            })
            .map(|(i, cell)| {
                (
                    self.projection.depth_key(cell.coord().base_center()),
                    i as u32,
                )
            })
            .collect();

        roots.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        roots.into_iter().map(|(_, i)| i).collect()
    }

    /// Window index of a coordinate, `None` outside the window.
    #[must_use]
    pub fn index_of(&self, coord: VoxelCoord) -> Option<u32> {
        self.layout
            .and_then(|l| l.index(coord))
            .map(|i| i as u32)
    }

    /// The present cell at a coordinate, `None` outside the window or in an
    /// absent chunk.
    #[must_use]
    pub fn cell_at(&self, coord: VoxelCoord) -> Option<&RenderCell> {
        self.index_of(coord)
            .and_then(|i| self.cell(i))
            .filter(|cell| cell.is_present())
    }

    /// Cell at a window index.
    #[must_use]
    pub fn cell(&self, index: u32) -> Option<&RenderCell> {
        self.cells.get(index as usize)
    }

    /// All cells in index order.
    #[must_use]
    pub fn cells(&self) -> &[RenderCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [RenderCell] {
        &mut self.cells
    }

    /// Clears one camera's marks on every cell.
    pub fn reset_marks(&mut self, camera: CameraId) {
        for cell in &mut self.cells {
            cell.marks_mut().reset(camera);
        }
    }
}
