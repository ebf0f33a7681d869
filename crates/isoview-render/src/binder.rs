//! Per-frame binding of entities to the window cells they stand in.

use isoview_common::{EntityId, Projection};

use crate::entity::EntityArena;
use crate::frustum::FrustumCuller;
use crate::window::StreamingWindow;

/// Routes visible entities either onto their host cell or to the fallback
/// list drawn after the walk.
#[derive(Debug, Default)]
pub struct EntityBinder {
    /// Arena indices bound to a cell this frame
    bound: Vec<u32>,
    /// Arena indices with no host cell this frame
    fallback: Vec<u32>,
}

impl EntityBinder {
    /// Creates an empty binder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every eligible, in-frustum entity.
    ///
    /// Entities standing in a present window cell are attached to that cell,
    /// back to front by scalar depth then id. All others go to the fallback
    /// list. Any previous bindings are cleared first.
    pub fn bind(
        &mut self,
        window: &mut StreamingWindow,
        arena: &mut EntityArena,
        culler: &FrustumCuller,
        z_limit: Option<i32>,
    ) {
        self.clear(window, arena);
        let projection = *window.projection();

        let mut hosted: Vec<(u32, f32, EntityId, u32)> = Vec::new();
        for (slot, node) in arena.nodes().iter().enumerate() {
            let entity = node.entity();
            if !entity.is_render_eligible(z_limit) {
                continue;
            }
            if !culler.visible_extents(entity.projected(&projection), entity.extents(&projection)) {
                continue;
            }
            let host = window
                .index_of(entity.coord())
                .filter(|&i| window.cells()[i as usize].is_present());
            match host {
                Some(cell) => hosted.push((cell, entity.depth_key(&projection), entity.id, slot as u32)),
                None => self.fallback.push(slot as u32),
            }
        }

        hosted.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

        let nodes = arena.nodes_mut();
        let cells = window.cells_mut();
        for (cell, _, _, slot) in hosted {
            cells[cell as usize].bound_mut().push(slot);
            nodes[slot as usize].set_host(Some(cell));
            self.bound.push(slot);
        }

        sort_by_depth(&mut self.fallback, arena, &projection);
    }

    /// Removes this frame's bindings from the window and the arena.
    pub fn clear(&mut self, window: &mut StreamingWindow, arena: &mut EntityArena) {
        let cells = window.cells_mut();
        let nodes = arena.nodes_mut();
        for &slot in &self.bound {
            let Some(node) = nodes.get_mut(slot as usize) else {
                continue;
            };
            if let Some(cell) = node.host().and_then(|h| cells.get_mut(h as usize)) {
                cell.bound_mut().clear();
            }
            node.set_host(None);
        }
        self.bound.clear();
        self.fallback.clear();
    }

    /// Entities bound to a cell this frame, grouped by host.
    #[must_use]
    pub fn bound(&self) -> &[u32] {
        &self.bound
    }

    /// Entities with no host cell, back to front.
    #[must_use]
    pub fn fallback(&self) -> &[u32] {
        &self.fallback
    }
}

/// Sorts arena indices back to front by scalar depth, then id.
pub(crate) fn sort_by_depth(slots: &mut [u32], arena: &EntityArena, projection: &Projection) {
    slots.sort_by(|&a, &b| {
        let (Some(a), Some(b)) = (arena.get(a), arena.get(b)) else {
            return a.cmp(&b);
        };
        a.entity()
            .depth_key(projection)
            .total_cmp(&b.entity().depth_key(projection))
            .then(a.entity().id.cmp(&b.entity().id))
    });
}
