//! ID types for entities, cameras and sprites.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for entity IDs.
static ENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum number of cameras that may walk the same window (split-screen).
pub const MAX_CAMERAS: usize = 4;

/// Unique identifier for a dynamic entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new unique entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an entity ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a camera; doubles as its slot in per-node visitation marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraId(u8);

impl CameraId {
    /// The first (primary) camera.
    pub const PRIMARY: Self = Self(0);

    /// Creates a camera ID, or `None` if it exceeds [`MAX_CAMERAS`].
    #[must_use]
    pub const fn new(slot: u8) -> Option<Self> {
        if (slot as usize) < MAX_CAMERAS {
            Some(Self(slot))
        } else {
            None
        }
    }

    /// Returns the slot index for per-camera arrays.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a sprite in the external sprite atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteId(u32);

impl SpriteId {
    /// Creates a sprite ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}
