//! # Materials, Biomes, Environments
//!
//! The host's block and biome vocabulary as seen by the carving engine.
//! Block ids follow the host's numbering; the engine only compares them.

use serde::{Deserialize, Serialize};

/// A block type id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(pub u16);

impl Material {
    /// Air (empty).
    pub const AIR: Self = Self(0);
    /// Stone.
    pub const STONE: Self = Self(1);
    /// Grass.
    pub const GRASS: Self = Self(2);
    /// Dirt.
    pub const DIRT: Self = Self(3);
    /// Cobblestone.
    pub const COBBLESTONE: Self = Self(4);
    /// Bedrock.
    pub const BEDROCK: Self = Self(7);
    /// Water.
    pub const WATER: Self = Self(9);
    /// Lava.
    pub const LAVA: Self = Self(11);
    /// Sand.
    pub const SAND: Self = Self(12);
    /// Gold ore.
    pub const GOLD_ORE: Self = Self(14);
    /// Iron ore.
    pub const IRON_ORE: Self = Self(15);
    /// Sandstone.
    pub const SANDSTONE: Self = Self(24);
    /// Cobweb.
    pub const COBWEB: Self = Self(30);
    /// Mossy cobblestone.
    pub const MOSSY_COBBLESTONE: Self = Self(48);
    /// Monster spawner.
    pub const SPAWNER: Self = Self(52);
    /// Chest.
    pub const CHEST: Self = Self(54);
    /// Diamond ore.
    pub const DIAMOND_ORE: Self = Self(56);
    /// Ice.
    pub const ICE: Self = Self(79);
    /// Netherrack.
    pub const NETHERRACK: Self = Self(87);
    /// Glowstone.
    pub const GLOWSTONE: Self = Self(89);
    /// Smooth stone brick.
    pub const SMOOTH_BRICK: Self = Self(98);
    /// Nether brick.
    pub const NETHER_BRICK: Self = Self(112);
    /// End portal frame.
    pub const PORTAL_FRAME: Self = Self(120);
    /// End stone.
    pub const END_STONE: Self = Self(121);
    /// Emerald ore.
    pub const EMERALD_ORE: Self = Self(129);
    /// Packed ice.
    pub const PACKED_ICE: Self = Self(174);

    /// Returns true if this is air.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Returns true if a tunnel may be carved through this block.
    ///
    /// Bedrock bounds the world and is never replaced.
    #[inline]
    #[must_use]
    pub const fn is_carvable(self) -> bool {
        self.0 != Self::BEDROCK.0
    }
}

/// Biome types reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Biome {
    /// Ocean floor
    Ocean = 0,
    /// Beach/coastline
    Beach = 1,
    /// Plains/grassland
    Plains = 2,
    /// Forest
    Forest = 3,
    /// Dense jungle
    Jungle = 4,
    /// Arid desert
    Desert = 5,
    /// Cold tundra
    Tundra = 6,
    /// Snowy taiga forest
    Taiga = 7,
    /// High mountains
    Mountains = 8,
    /// Swamp/wetland
    Swamp = 9,
    /// Savanna grassland
    Savanna = 10,
    /// Badlands
    Badlands = 11,
    /// The burning underworld
    Nether = 12,
    /// The void islands
    TheEnd = 13,
}

impl Biome {
    /// Every biome, in id order.
    pub const ALL: [Self; 14] = [
        Self::Ocean,
        Self::Beach,
        Self::Plains,
        Self::Forest,
        Self::Jungle,
        Self::Desert,
        Self::Tundra,
        Self::Taiga,
        Self::Mountains,
        Self::Swamp,
        Self::Savanna,
        Self::Badlands,
        Self::Nether,
        Self::TheEnd,
    ];
}

/// The kind of world a cell belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Open sky above a solid surface; nodes sit below the surface.
    #[default]
    Surface,
    /// Solid ceiling (nether, end); nodes sit in a fixed band.
    Enclosed,
}
