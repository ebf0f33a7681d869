//! Procedural heightmap terrain.

use isoview_common::{ChunkCoord, ChunkDims, LocalCoord};
use noise::{NoiseFn, Perlin};

use crate::chunk::{Chunk, Voxel};
use crate::material::materials;
use crate::store::ChunkSource;

/// World generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// World seed
    pub seed: u32,
    /// Terrain scale (larger = smoother)
    pub terrain_scale: f64,
    /// Lowest terrain surface
    pub base_height: u32,
    /// Surface variation above the base
    pub height_scale: f64,
    /// Columns below this height are flooded
    pub water_level: u32,
    /// Surfaces at or above this height are snow
    pub snow_level: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            terrain_scale: 48.0,
            base_height: 4,
            height_scale: 16.0,
            water_level: 8,
            snow_level: 18,
        }
    }
}

/// Procedural world generator.
#[derive(Clone)]
pub struct WorldGenerator {
    /// Configuration
    config: GeneratorConfig,
    /// Terrain noise
    terrain_noise: Perlin,
    /// Detail noise
    detail_noise: Perlin,
}

impl WorldGenerator {
    /// Creates a new generator with the given config.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let terrain_noise = Perlin::new(config.seed);
        let detail_noise = Perlin::new(config.seed.wrapping_add(1));

        Self {
            config,
            terrain_noise,
            detail_noise,
        }
    }

    /// Creates a generator with default config.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::new(GeneratorConfig {
            seed,
            ..Default::default()
        })
    }

    /// Surface height of the column at world (x, y).
    #[must_use]
    pub fn surface_height(&self, world_x: i32, world_y: i32) -> u32 {
        let wx = f64::from(world_x) / self.config.terrain_scale;
        let wy = f64::from(world_y) / self.config.terrain_scale;

        let height = self.terrain_noise.get([wx, wy]);
        let detail = self.detail_noise.get([wx * 4.0, wy * 4.0]) * 0.1;
        let combined = ((height + detail + 1.0) / 2.0).clamp(0.0, 1.0);

        self.config.base_height + (combined * self.config.height_scale) as u32
    }

    /// Generates a chunk at the given coordinate.
    #[must_use]
    pub fn generate_chunk(&self, coord: ChunkCoord, dims: ChunkDims) -> Chunk {
        let mut chunk = Chunk::new(coord, dims);
        let origin = coord.origin(dims);

        for y in 0..dims.depth {
            for x in 0..dims.width {
                let surface = self
                    .surface_height(origin.x + x as i32, origin.y + y as i32)
                    .min(dims.height);
                for z in 0..dims.height {
                    let material = self.material_at(z, surface);
                    if material != materials::AIR {
                        chunk.set(
                            LocalCoord::new(x as u16, y as u16, z as u16),
                            Voxel::new(material),
                        );
                    }
                }
            }
        }

        chunk
    }

    /// Picks the material at height `z` of a column whose surface is `surface`.
    fn material_at(&self, z: u32, surface: u32) -> u16 {
        if z >= surface {
            return if z < self.config.water_level {
                materials::WATER
            } else {
                materials::AIR
            };
        }
        let top = z + 1 == surface;
        match z {
            _ if top && surface >= self.config.snow_level => materials::SNOW,
            _ if top && surface <= self.config.water_level => materials::SAND,
            _ if top => materials::GRASS,
            _ if z + 3 >= surface => materials::DIRT,
            _ => materials::STONE,
        }
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ChunkSource for WorldGenerator {
    fn produce(&self, coord: ChunkCoord, dims: ChunkDims) -> Chunk {
        self.generate_chunk(coord, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_deterministic() {
        let gen1 = WorldGenerator::with_seed(42);
        let gen2 = WorldGenerator::with_seed(42);
        let dims = ChunkDims::new(8, 8, 32);

        let chunk1 = gen1.generate_chunk(ChunkCoord::new(0, 0), dims);
        let chunk2 = gen2.generate_chunk(ChunkCoord::new(0, 0), dims);

        assert_eq!(chunk1.voxels(), chunk2.voxels());
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let gen1 = WorldGenerator::with_seed(42);
        let gen2 = WorldGenerator::with_seed(999);
        let dims = ChunkDims::new(16, 16, 32);

        let chunk1 = gen1.generate_chunk(ChunkCoord::new(3, 1), dims);
        let chunk2 = gen2.generate_chunk(ChunkCoord::new(3, 1), dims);

        assert_ne!(chunk1.voxels(), chunk2.voxels());
    }

    #[test]
    fn test_bedrock_is_stone() {
        let generator = WorldGenerator::with_seed(7);
        let dims = ChunkDims::new(4, 4, 32);
        let chunk = generator.generate_chunk(ChunkCoord::new(0, 0), dims);
        assert_eq!(
            chunk.get(LocalCoord::new(0, 0, 0)),
            Voxel::new(materials::STONE)
        );
    }

    #[test]
    fn test_surface_within_bounds() {
        let generator = WorldGenerator::new(GeneratorConfig::default());
        let cfg = generator.config();
        for x in -20..20 {
            let h = generator.surface_height(x * 7, x * 3);
            assert!(h >= cfg.base_height);
            assert!(h <= cfg.base_height + cfg.height_scale as u32);
        }
    }
}
