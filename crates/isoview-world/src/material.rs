//! Material properties and the sprite lookup service.

use isoview_common::SpriteId;

/// Well-known material IDs used by the generator and tests.
pub mod materials {
    /// Air / void
    pub const AIR: u16 = 0;
    /// Stone
    pub const STONE: u16 = 1;
    /// Dirt
    pub const DIRT: u16 = 2;
    /// Grass-topped dirt
    pub const GRASS: u16 = 3;
    /// Sand
    pub const SAND: u16 = 4;
    /// Water (transparent)
    pub const WATER: u16 = 5;
    /// Glass (transparent)
    pub const GLASS: u16 = 6;
    /// Snow
    pub const SNOW: u16 = 7;
}

/// Render-relevant properties of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialInfo {
    /// Sprite to draw, `None` for invisible materials
    pub sprite: Option<SpriteId>,
    /// Occupies its cell
    pub solid: bool,
    /// Lets neighbors show through
    pub transparent: bool,
    /// Blocks movement
    pub obstacle: bool,
}

impl MaterialInfo {
    /// Properties of air.
    pub const AIR: Self = Self {
        sprite: None,
        solid: false,
        transparent: true,
        obstacle: false,
    };

    /// An opaque solid block drawn with the given sprite.
    #[must_use]
    pub const fn block(sprite: u32) -> Self {
        Self {
            sprite: Some(SpriteId::new(sprite)),
            solid: true,
            transparent: false,
            obstacle: true,
        }
    }

    /// A see-through block drawn with the given sprite.
    #[must_use]
    pub const fn see_through(sprite: u32, obstacle: bool) -> Self {
        Self {
            sprite: Some(SpriteId::new(sprite)),
            solid: true,
            transparent: true,
            obstacle,
        }
    }

    /// Hides the faces of neighbors behind it.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.solid && !self.transparent
    }
}

/// Read-only material → sprite lookup, injected into the render engine.
pub trait SpriteLookup: Send + Sync {
    /// Returns the properties of a material; unknown materials behave as air.
    fn material(&self, material: u16) -> MaterialInfo;
}

/// Table-backed [`SpriteLookup`].
#[derive(Debug, Clone)]
pub struct MaterialTable {
    entries: Vec<MaterialInfo>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(materials::STONE, MaterialInfo::block(1));
        table.register(materials::DIRT, MaterialInfo::block(2));
        table.register(materials::GRASS, MaterialInfo::block(3));
        table.register(materials::SAND, MaterialInfo::block(4));
        table.register(materials::WATER, MaterialInfo::see_through(5, false));
        table.register(materials::GLASS, MaterialInfo::see_through(6, true));
        table.register(materials::SNOW, MaterialInfo::block(7));
        table
    }
}

impl MaterialTable {
    /// Creates a table where only air is defined.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: vec![MaterialInfo::AIR],
        }
    }

    /// Registers (or replaces) a material. Material 0 stays air.
    pub fn register(&mut self, material: u16, info: MaterialInfo) {
        if material == materials::AIR {
            return;
        }
        let index = material as usize;
        if self.entries.len() <= index {
            self.entries.resize(index + 1, MaterialInfo::AIR);
        }
        self.entries[index] = info;
    }

    /// Number of registered slots, including air.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if only air is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

impl SpriteLookup for MaterialTable {
    fn material(&self, material: u16) -> MaterialInfo {
        self.entries
            .get(material as usize)
            .copied()
            .unwrap_or(MaterialInfo::AIR)
    }
}
