//! Baseline orderings without the occlusion graph.
//!
//! The scalar sorter orders every visible candidate by one depth number.
//! It is correct for most scenes but has no occlusion guarantee when two
//! objects' keys are close relative to their sprite size, so it serves as a
//! fallback and a reference to validate the topological walk against.

use std::cmp::Ordering;

use crate::binder::EntityBinder;
use crate::depth_list::{DepthList, DrawItem, NodeKey};
use crate::entity::EntityArena;
use crate::node::DepthNode;
use crate::sorter::{FrameStats, WalkContext};
use crate::window::StreamingWindow;

struct Candidate {
    key: f32,
    node: NodeKey,
    item: DrawItem,
}

/// Visible, render-eligible cells followed by every routed entity, in
/// storage order.
fn candidates(
    window: &StreamingWindow,
    arena: &EntityArena,
    binder: &EntityBinder,
    ctx: &WalkContext<'_>,
) -> Vec<Candidate> {
    let cells = window.cells().iter().filter_map(|cell| {
        if !cell.is_render_eligible(ctx.z_limit) {
            return None;
        }
        let p = DepthNode::projected(cell, ctx.projection);
        if !ctx.culler.visible(p.x, p.y) {
            return None;
        }
        let item = cell.draw_item(ctx.z_limit)?;
        Some(Candidate {
            key: DepthNode::depth_key(cell, ctx.projection),
            node: DepthNode::key(cell),
            item,
        })
    });

    let entities = binder
        .bound()
        .iter()
        .chain(binder.fallback())
        .filter_map(|&slot| arena.get(slot))
        .filter_map(|node| {
            Some(Candidate {
                key: DepthNode::depth_key(node, ctx.projection),
                node: DepthNode::key(node),
                item: node.draw_item(ctx.z_limit)?,
            })
        });

    cells.chain(entities).collect()
}

/// Orders candidates by scalar depth with node identity as tie-break.
pub fn sort_scalar(
    window: &StreamingWindow,
    arena: &EntityArena,
    binder: &EntityBinder,
    ctx: &WalkContext<'_>,
    list: &mut DepthList,
) -> FrameStats {
    let mut all = candidates(window, arena, binder, ctx);
    all.sort_by(|a, b| match a.key.total_cmp(&b.key) {
        Ordering::Equal => a.node.cmp(&b.node),
        other => other,
    });
    for candidate in all {
        list.push(candidate.item);
    }
    FrameStats::from_list(list, binder.fallback().len(), 0)
}

/// Emits candidates in window storage order, entities last. No ordering
/// guarantee.
pub fn sort_unordered(
    window: &StreamingWindow,
    arena: &EntityArena,
    binder: &EntityBinder,
    ctx: &WalkContext<'_>,
    list: &mut DepthList,
) -> FrameStats {
    for candidate in candidates(window, arena, binder, ctx) {
        list.push(candidate.item);
    }
    FrameStats::from_list(list, binder.fallback().len(), 0)
}
