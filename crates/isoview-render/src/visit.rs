//! Per-camera visitation marks with O(1) per-frame reset.
//!
//! Every graph node stores, for each camera slot, the epoch at which the
//! camera last entered it and the epoch at which it finished it. A camera
//! advances its epoch once per frame, so "visited this frame" is an equality
//! test and nothing has to be cleared between frames. Marks start at zero and
//! a live epoch is never zero.

use isoview_common::{CameraId, MAX_CAMERAS};

/// A camera's frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameEpoch(u32);

impl FrameEpoch {
    /// Epoch before the first frame; never matches a fresh mark.
    pub const START: Self = Self(0);

    /// Advances to the next frame's epoch.
    ///
    /// Returns true when the counter wrapped, in which case stored marks for
    /// this camera must be reset before walking.
    pub fn advance(&mut self) -> bool {
        let (next, wrapped) = self.0.overflowing_add(1);
        self.0 = if wrapped { 1 } else { next };
        wrapped
    }

    /// Raw counter value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Mark {
    entered: u32,
    finished: u32,
}

/// Visitation marks of one node for every camera slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitMarks {
    slots: [Mark; MAX_CAMERAS],
}

impl VisitMarks {
    /// Whether the camera entered this node during the current frame.
    #[must_use]
    pub fn is_visited(&self, camera: CameraId, epoch: FrameEpoch) -> bool {
        self.slots[camera.slot()].entered == epoch.0
    }

    /// Whether the camera fully expanded this node during the current frame.
    #[must_use]
    pub fn is_finished(&self, camera: CameraId, epoch: FrameEpoch) -> bool {
        self.slots[camera.slot()].finished == epoch.0
    }

    /// Marks the node entered for this frame.
    pub fn mark_visited(&mut self, camera: CameraId, epoch: FrameEpoch) {
        self.slots[camera.slot()].entered = epoch.0;
    }

    /// Marks the node finished for this frame.
    pub fn mark_finished(&mut self, camera: CameraId, epoch: FrameEpoch) {
        self.slots[camera.slot()].finished = epoch.0;
    }

    /// Clears the marks of one camera.
    pub fn reset(&mut self, camera: CameraId) {
        self.slots[camera.slot()] = Mark::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(slot: u8) -> CameraId {
        CameraId::new(slot).expect("valid camera slot")
    }

    #[test]
    fn test_fresh_marks_unvisited() {
        let marks = VisitMarks::default();
        let mut epoch = FrameEpoch::START;
        epoch.advance();
        assert!(!marks.is_visited(camera(0), epoch));
        assert!(!marks.is_finished(camera(0), epoch));
    }

    #[test]
    fn test_advance_resets_in_constant_time() {
        let mut marks = VisitMarks::default();
        let mut epoch = FrameEpoch::START;
        epoch.advance();
        marks.mark_visited(camera(0), epoch);
        assert!(marks.is_visited(camera(0), epoch));

        epoch.advance();
        assert!(!marks.is_visited(camera(0), epoch));
    }

    #[test]
    fn test_cameras_are_isolated() {
        let mut marks = VisitMarks::default();
        let mut epoch = FrameEpoch::START;
        epoch.advance();
        marks.mark_visited(camera(1), epoch);
        assert!(marks.is_visited(camera(1), epoch));
        assert!(!marks.is_visited(camera(0), epoch));
        assert!(!marks.is_visited(camera(3), epoch));
    }

    #[test]
    fn test_wrap_skips_zero() {
        let mut epoch = FrameEpoch(u32::MAX);
        assert!(epoch.advance());
        assert_eq!(epoch.raw(), 1);
        assert!(!epoch.advance());
        assert_eq!(epoch.raw(), 2);
    }

    #[test]
    fn test_reset_single_camera() {
        let mut marks = VisitMarks::default();
        let mut epoch = FrameEpoch::START;
        epoch.advance();
        marks.mark_visited(camera(0), epoch);
        marks.mark_visited(camera(2), epoch);
        marks.reset(camera(0));
        assert!(!marks.is_visited(camera(0), epoch));
        assert!(marks.is_visited(camera(2), epoch));
    }
}
