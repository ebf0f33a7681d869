//! The authoritative voxel store and its in-memory implementation.
//!
//! The render engine never owns voxel data. It asks a [`VoxelStore`] for
//! chunks, requests loads for chunks it needs, and listens for
//! [`ChunkEvent`]s to learn when deferred loads complete or chunks change.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::AHashSet;
use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;
use isoview_common::{ChunkCoord, ChunkDims, StoreError, VoxelCoord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::chunk::{Chunk, Voxel};

/// Notification emitted by a store when a chunk's residency or content changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkEvent {
    /// A requested chunk finished loading
    Loaded(ChunkCoord),
    /// Voxels inside a resident chunk changed
    Changed(ChunkCoord),
    /// A chunk was evicted
    Unloaded(ChunkCoord),
}

impl ChunkEvent {
    /// Returns the chunk the event refers to.
    #[must_use]
    pub const fn coord(self) -> ChunkCoord {
        match self {
            Self::Loaded(c) | Self::Changed(c) | Self::Unloaded(c) => c,
        }
    }
}

/// Authoritative chunked voxel grid.
pub trait VoxelStore: Send + Sync {
    /// Chunk column dimensions served by this store.
    fn dims(&self) -> ChunkDims;

    /// Returns a resident chunk, or `None` if it is not loaded (yet).
    fn get_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>>;

    /// Requests that a chunk be loaded. May complete later.
    ///
    /// Requests for resident or already pending chunks are no-ops.
    fn request_load(&self, coord: ChunkCoord) -> Result<(), StoreError>;

    /// Whether the store can currently serve chunks.
    fn is_available(&self) -> bool {
        true
    }

    /// Subscribes to chunk events.
    fn subscribe(&self) -> Receiver<ChunkEvent>;
}

/// Produces chunk contents on demand (generator, file loader, test fixture).
pub trait ChunkSource: Send + Sync {
    /// Builds the chunk at `coord`.
    fn produce(&self, coord: ChunkCoord, dims: ChunkDims) -> Chunk;
}

impl<F> ChunkSource for F
where
    F: Fn(ChunkCoord, ChunkDims) -> Chunk + Send + Sync,
{
    fn produce(&self, coord: ChunkCoord, dims: ChunkDims) -> Chunk {
        self(coord, dims)
    }
}

/// Source producing empty (all-air) chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl ChunkSource for EmptySource {
    fn produce(&self, coord: ChunkCoord, dims: ChunkDims) -> Chunk {
        Chunk::new(coord, dims)
    }
}

/// When load requests are fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// Loads complete inside `request_load`
    Immediate,
    /// Loads queue until [`InMemoryStore::complete_pending`] runs
    Deferred,
}

/// In-memory [`VoxelStore`] backed by a [`ChunkSource`].
pub struct InMemoryStore {
    /// Column dimensions
    dims: ChunkDims,
    /// Resident chunks
    chunks: DashMap<ChunkCoord, Arc<Chunk>>,
    /// Content producer
    source: Box<dyn ChunkSource>,
    /// Load completion mode
    mode: LoadMode,
    /// Requests waiting for completion (deferred mode)
    pending: Mutex<PendingLoads>,
    /// Event subscribers
    subscribers: Mutex<Vec<Sender<ChunkEvent>>>,
    /// Whether requests are currently served
    available: AtomicBool,
    /// Accepted (non-duplicate) load requests
    load_requests: AtomicUsize,
}

#[derive(Default)]
struct PendingLoads {
    queue: VecDeque<ChunkCoord>,
    set: AHashSet<ChunkCoord>,
}

impl InMemoryStore {
    /// Creates a new store.
    #[must_use]
    pub fn new(dims: ChunkDims, source: impl ChunkSource + 'static, mode: LoadMode) -> Self {
        Self {
            dims,
            chunks: DashMap::new(),
            source: Box::new(source),
            mode,
            pending: Mutex::new(PendingLoads::default()),
            subscribers: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            load_requests: AtomicUsize::new(0),
        }
    }

    /// Creates an immediate-mode store of empty chunks.
    #[must_use]
    pub fn empty(dims: ChunkDims) -> Self {
        Self::new(dims, EmptySource, LoadMode::Immediate)
    }

    /// Marks the store available or unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Number of accepted load requests so far.
    #[must_use]
    pub fn load_requests(&self) -> usize {
        self.load_requests.load(Ordering::Relaxed)
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks waiting in the deferred queue.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().queue.len()
    }

    /// Checks if a chunk is resident.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Completes up to `max` deferred loads, oldest first.
    ///
    /// Returns the number of chunks loaded.
    pub fn complete_pending(&self, max: usize) -> usize {
        let mut done = 0;
        while done < max {
            let next = {
                let mut pending = self.pending.lock();
                let coord = pending.queue.pop_front();
                if let Some(c) = coord {
                    pending.set.remove(&c);
                }
                coord
            };
            let Some(coord) = next else { break };
            self.insert_produced(coord);
            done += 1;
        }
        if done > 0 {
            debug!("Completed {done} deferred chunk loads");
        }
        done
    }

    /// Inserts a prebuilt chunk, replacing any resident one.
    pub fn insert_chunk(&self, chunk: Chunk) {
        let coord = chunk.coord();
        let existed = self.chunks.insert(coord, Arc::new(chunk)).is_some();
        self.emit(if existed {
            ChunkEvent::Changed(coord)
        } else {
            ChunkEvent::Loaded(coord)
        });
    }

    /// Evicts a chunk.
    pub fn unload(&self, coord: ChunkCoord) -> bool {
        let removed = self.chunks.remove(&coord).is_some();
        if removed {
            self.emit(ChunkEvent::Unloaded(coord));
        }
        removed
    }

    /// Reads a voxel; non-resident chunks read as air.
    #[must_use]
    pub fn voxel(&self, coord: VoxelCoord) -> Voxel {
        let Some(local) = coord.to_local_coord(self.dims) else {
            return Voxel::AIR;
        };
        self.chunks
            .get(&coord.to_chunk_coord(self.dims))
            .map_or(Voxel::AIR, |chunk| chunk.get(local))
    }

    /// Writes a voxel, materializing its chunk if needed.
    ///
    /// Returns false when z is outside the column height.
    pub fn set_voxel(&self, coord: VoxelCoord, voxel: Voxel) -> bool {
        let Some(local) = coord.to_local_coord(self.dims) else {
            return false;
        };
        let chunk_coord = coord.to_chunk_coord(self.dims);
        let created = !self.chunks.contains_key(&chunk_coord);
        {
            let mut entry = self
                .chunks
                .entry(chunk_coord)
                .or_insert_with(|| Arc::new(self.source.produce(chunk_coord, self.dims)));
            Arc::make_mut(entry.value_mut()).set(local, voxel);
        }
        self.emit(if created {
            ChunkEvent::Loaded(chunk_coord)
        } else {
            ChunkEvent::Changed(chunk_coord)
        });
        true
    }

    fn insert_produced(&self, coord: ChunkCoord) {
        if self.chunks.contains_key(&coord) {
            return;
        }
        let chunk = self.source.produce(coord, self.dims);
        self.chunks.insert(coord, Arc::new(chunk));
        trace!("Loaded chunk ({}, {})", coord.x, coord.y);
        self.emit(ChunkEvent::Loaded(coord));
    }

    fn emit(&self, event: ChunkEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event).is_ok());
    }
}

impl VoxelStore for InMemoryStore {
    fn dims(&self) -> ChunkDims {
        self.dims
    }

    fn get_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.chunks.get(&coord).map(|c| Arc::clone(c.value()))
    }

    fn request_load(&self, coord: ChunkCoord) -> Result<(), StoreError> {
        if !self.is_available() {
            return Err(StoreError::Unavailable);
        }
        if self.chunks.contains_key(&coord) {
            return Ok(());
        }
        match self.mode {
            LoadMode::Immediate => {
                self.load_requests.fetch_add(1, Ordering::Relaxed);
                self.insert_produced(coord);
            },
            LoadMode::Deferred => {
                let mut pending = self.pending.lock();
                if pending.set.insert(coord) {
                    pending.queue.push_back(coord);
                    self.load_requests.fetch_add(1, Ordering::Relaxed);
                }
            },
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> Receiver<ChunkEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ChunkDims {
        ChunkDims::new(4, 4, 4)
    }

    #[test]
    fn test_immediate_load() {
        let store = InMemoryStore::empty(dims());
        let events = store.subscribe();
        store
            .request_load(ChunkCoord::new(1, 2))
            .expect("request failed");
        assert!(store.is_loaded(ChunkCoord::new(1, 2)));
        assert_eq!(
            events.try_recv().ok(),
            Some(ChunkEvent::Loaded(ChunkCoord::new(1, 2)))
        );
    }

    #[test]
    fn test_deferred_duplicate_requests_suppressed() {
        let store = InMemoryStore::new(dims(), EmptySource, LoadMode::Deferred);
        let coord = ChunkCoord::new(0, 0);
        store.request_load(coord).expect("request failed");
        store.request_load(coord).expect("request failed");
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.load_requests(), 1);
        assert!(store.get_chunk(coord).is_none());

        assert_eq!(store.complete_pending(8), 1);
        assert!(store.get_chunk(coord).is_some());
    }

    #[test]
    fn test_unavailable_rejects_requests() {
        let store = InMemoryStore::empty(dims());
        store.set_available(false);
        assert_eq!(
            store.request_load(ChunkCoord::new(0, 0)),
            Err(StoreError::Unavailable)
        );
    }

    #[test]
    fn test_set_voxel_emits_changed() {
        let store = InMemoryStore::empty(dims());
        let events = store.subscribe();
        assert!(store.set_voxel(VoxelCoord::new(-1, 0, 1), Voxel::new(3)));
        assert!(store.set_voxel(VoxelCoord::new(-2, 0, 1), Voxel::new(3)));
        assert_eq!(store.voxel(VoxelCoord::new(-1, 0, 1)), Voxel::new(3));
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ChunkEvent::Loaded(ChunkCoord::new(-1, 0)),
                ChunkEvent::Changed(ChunkCoord::new(-1, 0)),
            ]
        );
    }

    #[test]
    fn test_set_voxel_out_of_column() {
        let store = InMemoryStore::empty(dims());
        assert!(!store.set_voxel(VoxelCoord::new(0, 0, 4), Voxel::new(1)));
    }

    #[test]
    fn test_closure_source() {
        let store = InMemoryStore::new(
            dims(),
            |coord: ChunkCoord, dims: ChunkDims| {
                let mut chunk = Chunk::new(coord, dims);
                chunk.fill_column(0, 0, 2, Voxel::new(1));
                chunk
            },
            LoadMode::Immediate,
        );
        store
            .request_load(ChunkCoord::new(3, 3))
            .expect("request failed");
        assert_eq!(store.voxel(VoxelCoord::new(12, 12, 1)), Voxel::new(1));
        assert_eq!(store.voxel(VoxelCoord::new(12, 12, 2)), Voxel::AIR);
    }
}
