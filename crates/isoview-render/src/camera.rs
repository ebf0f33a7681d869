//! Isometric camera for viewing the world.
//!
//! The camera pans and zooms over projected (isometric screen) space and
//! reports the projected bounds it can see. Each camera also owns
//! its per-frame render state: the window anchor it asks for, its cutaway z
//! limit, its visitation epoch, the cached root frontier and its depth list.

use isoview_common::{CameraId, ChunkCoord, ChunkDims, Point, Projection, VoxelCoord};
use tracing::debug;

use crate::config::RenderConfig;
use crate::depth_list::DepthList;
use crate::visit::FrameEpoch;
use crate::window::StreamingWindow;

/// Minimum zoom level (zoomed out).
pub const MIN_ZOOM: f32 = 0.25;

/// Maximum zoom level (zoomed in).
pub const MAX_ZOOM: f32 = 8.0;

/// Default zoom level.
pub const DEFAULT_ZOOM: f32 = 1.0;

/// Load radius that starts wide and settles after the first fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingRadius {
    /// Radius of the first fill
    pub initial: u32,
    /// Radius afterwards
    pub steady: u32,
    filled: bool,
}

impl LoadingRadius {
    /// Creates a loading radius that has not filled yet.
    #[must_use]
    pub const fn new(initial: u32, steady: u32) -> Self {
        Self {
            initial,
            steady,
            filled: false,
        }
    }

    /// The radius to load at now.
    #[must_use]
    pub const fn current(&self) -> u32 {
        if self.filled {
            self.steady
        } else {
            self.initial
        }
    }

    /// Whether the first fill happened.
    #[must_use]
    pub const fn is_filled(&self) -> bool {
        self.filled
    }
}

/// Root frontier cached against the window generation and z limit it was
/// built for.
#[derive(Debug, Clone, Default)]
struct FrontierCache {
    key: Option<(u64, Option<i32>)>,
    roots: Vec<u32>,
}

/// Isometric camera for one view.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera slot
    id: CameraId,
    /// Camera position in projected coordinates (center of view).
    pub position: (f32, f32),
    /// Zoom level (1.0 = 1:1 pixel mapping).
    pub zoom: f32,
    /// Viewport size in pixels (width, height).
    pub viewport_size: (u32, u32),
    /// Chunk the camera's streaming is centered on
    anchor: Option<ChunkCoord>,
    /// Highest rendered z layer
    z_limit: Option<i32>,
    /// Streaming radius
    loading: LoadingRadius,
    /// Cached root frontier
    frontier: FrontierCache,
    /// Frame counter for visitation marks
    epoch: FrameEpoch,
    /// This frame's draw order
    depth_list: DepthList,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraId::PRIMARY, 1280, 720, &RenderConfig::default())
    }
}

impl Camera {
    /// Creates a new camera with the given viewport size.
    #[must_use]
    pub fn new(id: CameraId, viewport_width: u32, viewport_height: u32, config: &RenderConfig) -> Self {
        Self {
            id,
            position: (0.0, 0.0),
            zoom: DEFAULT_ZOOM,
            viewport_size: (viewport_width, viewport_height),
            anchor: None,
            z_limit: config.z_rendering_limit,
            loading: LoadingRadius::new(config.initial_loading_radius, config.loading_radius),
            frontier: FrontierCache::default(),
            epoch: FrameEpoch::START,
            depth_list: DepthList::new(config.max_rendered_objects),
        }
    }

    /// Camera slot.
    #[must_use]
    pub const fn id(&self) -> CameraId {
        self.id
    }

    /// Set absolute zoom level (clamped).
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Center camera on a projected position.
    pub fn center_on(&mut self, x: f32, y: f32) {
        self.position = (x, y);
    }

    /// Center camera on a grid-space point.
    pub fn focus_on(&mut self, point: Point, projection: &Projection) {
        let p = projection.project(point);
        self.center_on(p.x, p.y);
    }

    /// Moves the view a fraction `t` of the way toward a grid-space point.
    /// Returns the remaining projected distance.
    pub fn pan_toward(&mut self, point: Point, projection: &Projection, t: f32) -> f32 {
        let target = projection.project(point);
        let here = glam::Vec2::new(self.position.0, self.position.1);
        let next = here.lerp(target, t.clamp(0.0, 1.0));
        self.position = (next.x, next.y);
        next.distance(target)
    }

    /// Get visible projected bounds (min_x, min_y, max_x, max_y).
    #[must_use]
    pub fn visible_bounds(&self) -> (f32, f32, f32, f32) {
        let half_width = (self.viewport_size.0 as f32 / 2.0) / self.zoom;
        let half_height = (self.viewport_size.1 as f32 / 2.0) / self.zoom;

        (
            self.position.0 - half_width,  // min_x
            self.position.1 - half_height, // min_y
            self.position.0 + half_width,  // max_x
            self.position.1 + half_height, // max_y
        )
    }

    /// Chunk this camera's streaming is centered on.
    #[must_use]
    pub const fn anchor(&self) -> Option<ChunkCoord> {
        self.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: ChunkCoord) {
        self.anchor = Some(anchor);
    }

    /// Highest rendered z layer, `None` for no limit.
    #[must_use]
    pub const fn z_limit(&self) -> Option<i32> {
        self.z_limit
    }

    /// Changes the cutaway layer. The frontier rebuilds on the next frame.
    pub fn set_z_limit(&mut self, z_limit: Option<i32>) {
        self.z_limit = z_limit;
    }

    /// Streaming radius state.
    #[must_use]
    pub const fn loading_radius(&self) -> LoadingRadius {
        self.loading
    }

    pub(crate) fn mark_filled(&mut self) {
        self.loading.filled = true;
    }

    /// Grid rectangle `(min, max)` of every cell whose sprite may overlap
    /// the viewport, over the full column height. Only x and y are meaningful.
    #[must_use]
    pub fn visible_cell_rect(&self, projection: &Projection, dims: ChunkDims) -> (VoxelCoord, VoxelCoord) {
        let (min_x, min_y, max_x, max_y) = self.visible_bounds();
        let hw = projection.half_width();
        let hh = projection.half_height();
        let lh = projection.layer_height;
        let top = dims.height.saturating_sub(1) as f32;

        // Base center projects to px = u * hw and py = v * hh - z * lh with
        // u = x - y and v = x + y + 1.
        let u_min = (min_x - hw) / hw;
        let u_max = (max_x + hw) / hw;
        let v_min = (min_y - hh) / hh;
        let v_max = (max_y + lh + hh + top * lh) / hh;

        let min = VoxelCoord::new(
            ((u_min + v_min - 1.0) * 0.5).floor() as i32,
            ((v_min - u_max - 1.0) * 0.5).floor() as i32,
            0,
        );
        let max = VoxelCoord::new(
            ((u_max + v_max - 1.0) * 0.5).ceil() as i32,
            ((v_max - u_min - 1.0) * 0.5).ceil() as i32,
            top as i32,
        );
        (min, max)
    }

    /// Smallest window radius around `anchor` that holds the visible rect.
    #[must_use]
    pub fn required_radius(&self, anchor: ChunkCoord, projection: &Projection, dims: ChunkDims) -> u32 {
        let (min, max) = self.visible_cell_rect(projection, dims);
        let low = min.to_chunk_coord(dims);
        let high = max.to_chunk_coord(dims);
        anchor
            .chebyshev_distance(low)
            .max(anchor.chebyshev_distance(high))
            .max(anchor.chebyshev_distance(ChunkCoord::new(low.x, high.y)))
            .max(anchor.chebyshev_distance(ChunkCoord::new(high.x, low.y)))
    }

    /// Current frame epoch.
    #[must_use]
    pub const fn epoch(&self) -> FrameEpoch {
        self.epoch
    }

    /// Starts a new frame. Returns true when the epoch wrapped and this
    /// camera's marks must be reset.
    pub fn advance_epoch(&mut self) -> bool {
        self.epoch.advance()
    }

    /// Rebuilds the root frontier if the window or z limit changed since it
    /// was cached. Returns true when it was rebuilt.
    pub fn refresh_frontier(&mut self, window: &StreamingWindow) -> bool {
        let key = (window.generation(), self.z_limit);
        if self.frontier.key == Some(key) {
            return false;
        }
        self.frontier.roots = window.root_frontier(self.z_limit);
        self.frontier.key = Some(key);
        debug!(
            "Camera {} rebuilt root frontier: {} roots (generation {})",
            self.id.slot(),
            self.frontier.roots.len(),
            key.0
        );
        true
    }

    /// Drops the cached frontier.
    pub fn invalidate_frontier(&mut self) {
        self.frontier.key = None;
    }

    /// Cached root frontier (window cell indices, back to front).
    #[must_use]
    pub fn frontier(&self) -> &[u32] {
        &self.frontier.roots
    }

    /// This frame's draw list.
    #[must_use]
    pub const fn depth_list(&self) -> &DepthList {
        &self.depth_list
    }

    /// Frontier and draw list, borrowed together for a walk.
    pub fn frontier_and_list_mut(&mut self) -> (&[u32], &mut DepthList) {
        (&self.frontier.roots, &mut self.depth_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(CameraId::PRIMARY, 1920, 1080, &RenderConfig::default());
        assert_eq!(camera.viewport_size, (1920, 1080));
        assert!((camera.zoom - DEFAULT_ZOOM).abs() < f32::EPSILON);
        assert_eq!(camera.depth_list().capacity(), 20_000);
        assert_eq!(camera.loading_radius().current(), 2);
    }

    #[test]
    fn test_camera_zoom_clamp() {
        let mut camera = Camera::default();

        camera.set_zoom(100.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f32::EPSILON);

        camera.set_zoom(0.01);
        assert!((camera.zoom - MIN_ZOOM).abs() < f32::EPSILON);
    }

    #[test]
    fn test_visible_bounds_zoomed() {
        let mut camera = Camera::new(CameraId::PRIMARY, 800, 600, &RenderConfig::default());
        camera.center_on(0.0, 0.0);
        camera.set_zoom(2.0);

        let (min_x, min_y, max_x, max_y) = camera.visible_bounds();
        assert!((min_x - (-200.0)).abs() < f32::EPSILON);
        assert!((max_x - 200.0).abs() < f32::EPSILON);
        assert!((min_y - (-150.0)).abs() < f32::EPSILON);
        assert!((max_y - 150.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pan_toward_converges() {
        let projection = Projection::default();
        let mut camera = Camera::default();
        let target = glam::Vec3::new(4.0, 2.0, 1.0);

        let half = camera.pan_toward(target, &projection, 0.5);
        let p = projection.project(target);
        assert!((camera.position.0 - p.x * 0.5).abs() < 1e-3);
        assert!((camera.position.1 - p.y * 0.5).abs() < 1e-3);

        let rest = camera.pan_toward(target, &projection, 1.0);
        assert!(rest < half);
        assert!(rest.abs() < 1e-3);
    }

    #[test]
    fn test_loading_radius_settles() {
        let mut camera = Camera::default();
        assert!(!camera.loading_radius().is_filled());
        camera.mark_filled();
        assert_eq!(camera.loading_radius().current(), 1);
    }

    #[test]
    fn test_visible_cell_rect_contains_visible_cells() {
        let projection = Projection::default();
        let dims = ChunkDims::new(8, 8, 8);
        let mut camera = Camera::new(CameraId::PRIMARY, 640, 480, &RenderConfig::default());
        camera.focus_on(glam::Vec3::new(20.0, -7.0, 0.0), &projection);
        let (min, max) = camera.visible_cell_rect(&projection, dims);

        let (bx0, by0, bx1, by1) = camera.visible_bounds();
        for x in -40..80 {
            for y in -60..60 {
                for z in 0..8 {
                    let p = projection.project_coord(VoxelCoord::new(x, y, z));
                    let overlaps = p.x + 32.0 >= bx0
                        && p.x - 32.0 <= bx1
                        && p.y + 16.0 >= by0
                        && p.y - 48.0 <= by1;
                    if overlaps {
                        assert!(x >= min.x && x <= max.x, "x {x} outside rect");
                        assert!(y >= min.y && y <= max.y, "y {y} outside rect");
                    }
                }
            }
        }
    }

    #[test]
    fn test_required_radius_grows_when_zoomed_out() {
        let projection = Projection::default();
        let dims = ChunkDims::new(16, 16, 16);
        let mut camera = Camera::default();
        camera.set_zoom(2.0);
        let near = camera.required_radius(ChunkCoord::new(0, 0), &projection, dims);
        camera.set_zoom(MIN_ZOOM);
        let far = camera.required_radius(ChunkCoord::new(0, 0), &projection, dims);
        assert!(far > near);
    }

    #[test]
    fn test_epoch_advances() {
        let mut camera = Camera::default();
        let before = camera.epoch();
        assert!(!camera.advance_epoch());
        assert_ne!(camera.epoch(), before);
    }
}
