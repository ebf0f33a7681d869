//! # Isoview Render
//!
//! Visibility and render-order engine for streamed isometric voxel worlds.
//!
//! This crate provides:
//! - A streaming window of render cells around the primary camera
//! - Frustum culling in projected screen space
//! - Per-frame binding of dynamic entities to the cells they stand in
//! - A topological depth sort over the cell/entity occlusion graph
//! - A scalar depth sort kept as a fallback and reference
//! - Per-camera, bounded depth lists
//!
//! ## Occlusion Graph
//!
//! Every window cell covers its present neighbors at -x, -y and -z. A cell
//! is drawn only after everything it covers, so walking the graph depth
//! first from the front-most cells and emitting nodes in post-order yields
//! a strict back-to-front list. Entities are spliced into the graph through
//! the cell hosting them.
//!
//! ## Multiple Cameras
//!
//! Up to [`MAX_CAMERAS`](isoview_common::MAX_CAMERAS) cameras share one
//! window. Each node keeps a visitation mark per camera slot, stamped with
//! the camera's frame epoch, so nothing has to be cleared between frames.
//!
//! ## Streaming
//!
//! When the primary camera's anchor chunk moves by one, the window shifts
//! and only the entering chunks are wrapped. Larger jumps rebuild the
//! window from the store. Chunk events from the store update wrapped cells
//! in place.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod binder;
pub mod camera;
pub mod cell;
pub mod config;
pub mod depth_list;
pub mod entity;
pub mod frustum;
pub mod node;
pub mod scalar;
pub mod scene;
pub mod sorter;
pub mod visit;
pub mod window;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::binder::*;
    pub use crate::camera::*;
    pub use crate::cell::*;
    pub use crate::config::*;
    pub use crate::depth_list::*;
    pub use crate::entity::*;
    pub use crate::frustum::*;
    pub use crate::node::*;
    pub use crate::scalar::*;
    pub use crate::scene::*;
    pub use crate::sorter::*;
    pub use crate::visit::*;
    pub use crate::window::*;
}

pub use prelude::*;
