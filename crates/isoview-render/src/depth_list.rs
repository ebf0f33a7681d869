//! The per-camera, per-frame ordered draw sequence.

use isoview_common::{EntityId, Point, SpriteId, VoxelCoord};

/// One entry of a [`DepthList`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawItem {
    /// A voxel cell
    Cell {
        /// Grid position
        coord: VoxelCoord,
        /// Sprite to draw
        sprite: SpriteId,
        /// Faces hidden by opaque neighbors (see [`ClipFlags`](crate::cell::ClipFlags))
        clip: u8,
    },
    /// A dynamic entity
    Entity {
        /// Entity identity
        id: EntityId,
        /// Feet position
        position: Point,
    },
}

impl DrawItem {
    /// Identity of the drawn node.
    #[must_use]
    pub const fn key(&self) -> NodeKey {
        match *self {
            Self::Cell { coord, .. } => NodeKey::Cell(coord),
            Self::Entity { id, .. } => NodeKey::Entity(id),
        }
    }
}

/// Frame-independent node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    /// Cell at a grid coordinate
    Cell(VoxelCoord),
    /// Entity by id
    Entity(EntityId),
}

/// Bounded, strictly back-to-front draw list.
///
/// The list is rebuilt every frame. Appends past the capacity are rejected
/// and counted as overflow; the list itself never grows past its cap.
#[derive(Debug, Clone)]
pub struct DepthList {
    items: Vec<DrawItem>,
    capacity: usize,
    overflow: usize,
    revisits: usize,
}

impl DepthList {
    /// Creates an empty list holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(4096)),
            capacity,
            overflow: 0,
            revisits: 0,
        }
    }

    /// Empties the list and resets its counters.
    pub fn clear(&mut self) {
        self.items.clear();
        self.overflow = 0;
        self.revisits = 0;
    }

    /// Appends an item. Returns false (and counts overflow) when full.
    pub fn push(&mut self, item: DrawItem) -> bool {
        if self.is_full() {
            self.overflow += 1;
            return false;
        }
        self.items.push(item);
        true
    }

    /// Whether the cap has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Draw items in draw order.
    #[must_use]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Iterates draw items in draw order.
    pub fn iter(&self) -> std::slice::Iter<'_, DrawItem> {
        self.items.iter()
    }

    /// Maximum number of items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the cap. Items past a smaller cap are dropped.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.items.truncate(capacity);
    }

    /// Nodes dropped or left unwalked because the list was full.
    #[must_use]
    pub const fn overflow(&self) -> usize {
        self.overflow
    }

    /// Nodes reached again while still being expanded (graph cycles).
    #[must_use]
    pub const fn revisits(&self) -> usize {
        self.revisits
    }

    /// Position of a node in the list.
    #[must_use]
    pub fn position_of(&self, key: NodeKey) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    pub(crate) fn record_overflow(&mut self, count: usize) {
        self.overflow += count;
    }

    pub(crate) fn record_revisit(&mut self) {
        self.revisits += 1;
    }
}

impl<'a> IntoIterator for &'a DepthList {
    type Item = &'a DrawItem;
    type IntoIter = std::slice::Iter<'a, DrawItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: i32) -> DrawItem {
        DrawItem::Cell {
            coord: VoxelCoord::new(x, 0, 0),
            sprite: SpriteId::new(1),
            clip: 0,
        }
    }

    #[test]
    fn test_push_respects_capacity() {
        let mut list = DepthList::new(2);
        assert!(list.push(cell(0)));
        assert!(list.push(cell(1)));
        assert!(!list.push(cell(2)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.overflow(), 1);
        assert!(list.is_full());
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut list = DepthList::new(1);
        list.push(cell(0));
        list.push(cell(1));
        list.record_revisit();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.overflow(), 0);
        assert_eq!(list.revisits(), 0);
    }

    #[test]
    fn test_position_of() {
        let mut list = DepthList::new(4);
        list.push(cell(3));
        list.push(cell(7));
        assert_eq!(
            list.position_of(NodeKey::Cell(VoxelCoord::new(7, 0, 0))),
            Some(1)
        );
        assert_eq!(list.position_of(NodeKey::Entity(EntityId::from_raw(9))), None);
    }

    #[test]
    fn test_shrinking_capacity_truncates() {
        let mut list = DepthList::new(4);
        for x in 0..4 {
            list.push(cell(x));
        }
        list.set_capacity(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.items()[1].key(), NodeKey::Cell(VoxelCoord::new(1, 0, 0)));
    }
}
