//! Render engine configuration.
//!
//! Streaming radii, the depth-list cap, the cutaway z limit and the sorting
//! strategy. Configuration can be loaded from and saved to a TOML file.

use isoview_common::{ChunkDims, Projection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

/// Largest accepted chunk footprint or height.
const MAX_CHUNK_EXTENT: u32 = 256;

/// How a camera's depth list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    /// Post-order walk of the occlusion graph
    #[default]
    Topological,
    /// Comparison sort on a scalar depth key (best effort)
    Scalar,
    /// Storage order, no ordering guarantee
    None,
}

/// Order between an entity and the cell it stands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostTieBreak {
    /// Entities are emitted before their host cell
    #[default]
    EntityFirst,
    /// The host cell is emitted before its entities
    HostFirst,
}

/// Render engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    // === Streaming ===
    /// Steady-state load radius in chunks
    pub loading_radius: u32,
    /// Load radius of a camera's first fill
    pub initial_loading_radius: u32,
    /// Upper bound on the window radius in chunks
    pub max_window_radius: u32,
    /// Ticks before a pending load is requested again
    pub pending_retry_ticks: u64,

    // === Ordering ===
    /// Depth list capacity per camera
    pub max_rendered_objects: usize,
    /// Highest rendered z layer (None = unlimited)
    pub z_rendering_limit: Option<i32>,
    /// Sorting strategy
    pub sort_strategy: SortStrategy,
    /// Entity / host cell tie-break
    pub host_tie_break: HostTieBreak,

    // === Geometry ===
    /// Chunk column dimensions
    pub chunk_dims: ChunkDims,
    /// Isometric projection
    pub projection: Projection,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            loading_radius: 1,
            initial_loading_radius: 2,
            max_window_radius: 4,
            pending_retry_ticks: 120,

            max_rendered_objects: 20_000,
            z_rendering_limit: None,
            sort_strategy: SortStrategy::Topological,
            host_tie_break: HostTieBreak::EntityFirst,

            chunk_dims: ChunkDims::default(),
            projection: Projection::default(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Render config not found at {}, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read render config: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded render config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse render config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved render config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Streaming
        self.max_window_radius = self.max_window_radius.clamp(1, 16);
        self.loading_radius = self.loading_radius.min(self.max_window_radius);
        self.initial_loading_radius = self
            .initial_loading_radius
            .clamp(self.loading_radius, self.max_window_radius);
        self.pending_retry_ticks = self.pending_retry_ticks.max(1);

        // Ordering
        self.max_rendered_objects = self.max_rendered_objects.max(1);

        // Geometry
        let dims = &mut self.chunk_dims;
        dims.width = dims.width.clamp(1, MAX_CHUNK_EXTENT);
        dims.depth = dims.depth.clamp(1, MAX_CHUNK_EXTENT);
        dims.height = dims.height.clamp(1, MAX_CHUNK_EXTENT);

        let defaults = Projection::default();
        let proj = &mut self.projection;
        if proj.tile_width <= 0.0 || !proj.tile_width.is_finite() {
            proj.tile_width = defaults.tile_width;
        }
        if proj.tile_height <= 0.0 || !proj.tile_height.is_finite() {
            proj.tile_height = defaults.tile_height;
        }
        if proj.layer_height <= 0.0 || !proj.layer_height.is_finite() {
            proj.layer_height = defaults.layer_height;
        }
    }
}
