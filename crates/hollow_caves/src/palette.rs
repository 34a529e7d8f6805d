//! # Biome Palettes
//!
//! Material choices live in data, not in the carving engine. The engine
//! asks a `Palette` for one `BiomePalette` and reads everything biome
//! dependent from it: surface materials, blocks that must never be
//! overwritten, tunnel girth, darkness, node depth and decoration weights.
//!
//! ## File Format
//!
//! ```toml
//! [fallback]
//! corner = 4
//! edge = 48
//! wall = 4
//! floor = 98
//!
//! [[biome]]
//! biomes = ["desert", "badlands"]
//! [biome.palette]
//! corner = 24
//! edge = 24
//! wall = 24
//! floor = 12
//! darkness = 24.0
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carving::SurfaceClass;
use crate::error::{CaveError, CaveResult};
use crate::material::{Biome, Material};

/// Biome-keyed lookup, supplied by the host.
pub trait Palette {
    /// Returns the palette used for tunnels anchored in `biome`.
    fn palette_for(&self, biome: Biome) -> &BiomePalette;
}

/// Blocks that are never overwritten, per surface class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpareSets {
    /// Spared where a corner would be placed.
    pub corner: Vec<Material>,
    /// Spared where an edge would be placed.
    pub edge: Vec<Material>,
    /// Spared where a wall would be placed.
    pub wall: Vec<Material>,
    /// Spared where a floor would be placed.
    pub floor: Vec<Material>,
    /// Spared where open air would be carved.
    pub interior: Vec<Material>,
}

impl SpareSets {
    /// The same set for every class.
    #[must_use]
    pub fn uniform(materials: &[Material]) -> Self {
        Self {
            corner: materials.to_vec(),
            edge: materials.to_vec(),
            wall: materials.to_vec(),
            floor: materials.to_vec(),
            interior: materials.to_vec(),
        }
    }

    /// The spared materials for `class`.
    #[must_use]
    pub fn for_class(&self, class: SurfaceClass) -> &[Material] {
        match class {
            SurfaceClass::Corner => &self.corner,
            SurfaceClass::Edge => &self.edge,
            SurfaceClass::Wall => &self.wall,
            SurfaceClass::Floor => &self.floor,
            SurfaceClass::Interior => &self.interior,
        }
    }
}

/// What a decoration is for; the host decides what goes inside spawners
/// and chests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Light source.
    Light,
    /// Something that hurts.
    Hazard,
    /// Mob spawner.
    Spawner,
    /// Loot container.
    Loot,
}

/// One weighted decoration choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// What the feature is.
    pub kind: FeatureKind,
    /// Block placed for it.
    pub material: Material,
    /// Relative draw weight.
    pub weight: u32,
}

impl Feature {
    /// Creates a feature entry.
    #[must_use]
    pub const fn new(kind: FeatureKind, material: Material, weight: u32) -> Self {
        Self {
            kind,
            material,
            weight,
        }
    }
}

/// Weighted decoration choices, with an explicit weight for "nothing".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureTable {
    /// Weight of placing nothing.
    pub blank: u32,
    /// The choices.
    pub entries: Vec<Feature>,
}

impl FeatureTable {
    /// Draw weights, `blank` first.
    #[must_use]
    pub fn weights(&self) -> Vec<u32> {
        std::iter::once(self.blank)
            .chain(self.entries.iter().map(|f| f.weight))
            .collect()
    }

    /// Maps a draw index from `weights()` back to a feature.
    #[must_use]
    pub fn pick(&self, index: usize) -> Option<Feature> {
        index.checked_sub(1).and_then(|i| self.entries.get(i).copied())
    }
}

fn default_interior() -> Material {
    Material::AIR
}

const fn default_girth_scale() -> f64 {
    1.0
}

const fn default_darkness() -> f64 {
    64.0
}

const fn default_node_depth() -> f64 {
    0.5
}

/// Everything biome dependent about one tunnel network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomePalette {
    /// Material for voxels with 3 interior neighbours.
    pub corner: Material,
    /// Material for voxels with 4 interior neighbours.
    pub edge: Material,
    /// Material for 5-neighbour voxels supported from below.
    pub wall: Material,
    /// Material for 5-neighbour voxels with nothing below.
    pub floor: Material,
    /// Material for fully enclosed voxels.
    #[serde(default = "default_interior")]
    pub interior: Material,
    /// Blocks never overwritten, per class.
    #[serde(default)]
    pub spare: SpareSets,
    /// Multiplies the configured girth factor.
    #[serde(default = "default_girth_scale")]
    pub girth_scale: f64,
    /// Networks whose longest spoke is shorter than this get decorated.
    #[serde(default = "default_darkness")]
    pub darkness: f64,
    /// Node elevation as a fraction of the surface height.
    #[serde(default = "default_node_depth")]
    pub node_depth: f64,
    /// Ceiling decorations.
    #[serde(default)]
    pub ceiling_features: FeatureTable,
    /// Floor decorations.
    #[serde(default)]
    pub floor_features: FeatureTable,
}

impl BiomePalette {
    /// Stone-brick tunnels lit with glowstone, sparing ores and containers.
    #[must_use]
    pub fn stone() -> Self {
        Self {
            corner: Material::COBBLESTONE,
            edge: Material::MOSSY_COBBLESTONE,
            wall: Material::COBBLESTONE,
            floor: Material::SMOOTH_BRICK,
            interior: Material::AIR,
            spare: SpareSets::uniform(&[
                Material::DIAMOND_ORE,
                Material::EMERALD_ORE,
                Material::GOLD_ORE,
                Material::CHEST,
                Material::SPAWNER,
                Material::PORTAL_FRAME,
            ]),
            girth_scale: 1.0,
            darkness: 64.0,
            node_depth: 0.5,
            ceiling_features: FeatureTable {
                blank: 2,
                entries: vec![
                    Feature::new(FeatureKind::Light, Material::GLOWSTONE, 6),
                    Feature::new(FeatureKind::Hazard, Material::COBWEB, 2),
                    Feature::new(FeatureKind::Spawner, Material::SPAWNER, 1),
                ],
            },
            floor_features: FeatureTable {
                blank: 4,
                entries: vec![
                    Feature::new(FeatureKind::Loot, Material::CHEST, 3),
                    Feature::new(FeatureKind::Spawner, Material::SPAWNER, 1),
                    Feature::new(FeatureKind::Hazard, Material::LAVA, 1),
                ],
            },
        }
    }

    /// The placed material for `class`.
    #[must_use]
    pub const fn material(&self, class: SurfaceClass) -> Material {
        match class {
            SurfaceClass::Corner => self.corner,
            SurfaceClass::Edge => self.edge,
            SurfaceClass::Wall => self.wall,
            SurfaceClass::Floor => self.floor,
            SurfaceClass::Interior => self.interior,
        }
    }

    /// Returns true if `existing` must survive a `class` placement.
    #[must_use]
    pub fn spares(&self, class: SurfaceClass, existing: Material) -> bool {
        self.spare.for_class(class).contains(&existing)
    }

    fn validate(&self) -> CaveResult<()> {
        for (name, value) in [
            ("girth_scale", self.girth_scale),
            ("darkness", self.darkness),
            ("node_depth", self.node_depth),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CaveError::InvalidConfig(format!(
                    "palette {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One `[[biome]]` entry of a palette file.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BiomeEntry {
    biomes: Vec<Biome>,
    palette: BiomePalette,
}

/// On-disk palette layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PaletteFile {
    fallback: BiomePalette,
    #[serde(default)]
    biome: Vec<BiomeEntry>,
}

/// Palette backed by a biome map with a fallback entry.
#[derive(Clone, Debug, PartialEq)]
pub struct PaletteTable {
    fallback: BiomePalette,
    biomes: HashMap<Biome, BiomePalette>,
}

impl PaletteTable {
    /// A table that answers `palette` for every biome.
    #[must_use]
    pub fn uniform(palette: BiomePalette) -> Self {
        Self {
            fallback: palette,
            biomes: HashMap::new(),
        }
    }

    /// Adds or replaces the palette for `biome`.
    #[must_use]
    pub fn with_biome(mut self, biome: Biome, palette: BiomePalette) -> Self {
        self.biomes.insert(biome, palette);
        self
    }

    /// Parses a palette file.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::InvalidConfig` if the text does not parse, a
    /// biome is listed twice, or a scale is negative.
    pub fn from_toml_str(text: &str) -> CaveResult<Self> {
        let file: PaletteFile = toml::from_str(text)?;
        file.fallback.validate()?;

        let mut table = Self::uniform(file.fallback);
        for entry in file.biome {
            entry.palette.validate()?;
            for biome in entry.biomes {
                if table.biomes.insert(biome, entry.palette.clone()).is_some() {
                    return Err(CaveError::InvalidConfig(format!(
                        "biome {biome:?} appears in more than one palette entry"
                    )));
                }
            }
        }
        Ok(table)
    }

    /// Reads a palette file.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::InvalidConfig` if the file cannot be read or is
    /// invalid.
    pub fn from_file(path: &Path) -> CaveResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CaveError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for PaletteTable {
    /// Stone everywhere, with themed variants for dry, frozen, wet and
    /// otherworldly biomes.
    fn default() -> Self {
        let stone = BiomePalette::stone();

        let sandstone = BiomePalette {
            corner: Material::SANDSTONE,
            edge: Material::SANDSTONE,
            wall: Material::SANDSTONE,
            floor: Material::SAND,
            darkness: 24.0,
            ..stone.clone()
        };
        let frozen = BiomePalette {
            corner: Material::PACKED_ICE,
            edge: Material::ICE,
            wall: Material::PACKED_ICE,
            floor: Material::PACKED_ICE,
            girth_scale: 0.9,
            ..stone.clone()
        };
        let overgrown = BiomePalette {
            corner: Material::MOSSY_COBBLESTONE,
            edge: Material::MOSSY_COBBLESTONE,
            wall: Material::MOSSY_COBBLESTONE,
            floor: Material::DIRT,
            girth_scale: 1.15,
            ..stone.clone()
        };
        let nether = BiomePalette {
            corner: Material::NETHER_BRICK,
            edge: Material::NETHER_BRICK,
            wall: Material::NETHERRACK,
            floor: Material::NETHER_BRICK,
            girth_scale: 1.3,
            darkness: 48.0,
            ceiling_features: FeatureTable {
                blank: 1,
                entries: vec![
                    Feature::new(FeatureKind::Light, Material::GLOWSTONE, 3),
                    Feature::new(FeatureKind::Hazard, Material::LAVA, 2),
                ],
            },
            ..stone.clone()
        };
        let end = BiomePalette {
            corner: Material::END_STONE,
            edge: Material::END_STONE,
            wall: Material::END_STONE,
            floor: Material::END_STONE,
            darkness: 16.0,
            ..stone.clone()
        };

        let mut table = Self::uniform(stone);
        for biome in [Biome::Desert, Biome::Badlands, Biome::Beach] {
            table.biomes.insert(biome, sandstone.clone());
        }
        for biome in [Biome::Tundra, Biome::Taiga] {
            table.biomes.insert(biome, frozen.clone());
        }
        for biome in [Biome::Jungle, Biome::Swamp] {
            table.biomes.insert(biome, overgrown.clone());
        }
        table.biomes.insert(Biome::Nether, nether);
        table.biomes.insert(Biome::TheEnd, end);
        table
    }
}

impl Palette for PaletteTable {
    fn palette_for(&self, biome: Biome) -> &BiomePalette {
        self.biomes.get(&biome).unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
        [fallback]
        corner = 4
        edge = 48
        wall = 4
        floor = 98
        spare = { floor = [56, 54] }

        [[biome]]
        biomes = ["desert", "badlands"]
        [biome.palette]
        corner = 24
        edge = 24
        wall = 24
        floor = 12
        darkness = 24.0
        [biome.palette.floor_features]
        blank = 1
        entries = [{ kind = "loot", material = 54, weight = 3 }]
    "#;

    #[test]
    fn test_parses_palette_file() {
        let table = PaletteTable::from_toml_str(FILE).unwrap();

        let plains = table.palette_for(Biome::Plains);
        assert_eq!(plains.floor, Material::SMOOTH_BRICK);
        assert_eq!(plains.interior, Material::AIR);
        assert!(plains.spares(SurfaceClass::Floor, Material::DIAMOND_ORE));
        assert!(!plains.spares(SurfaceClass::Wall, Material::DIAMOND_ORE));

        let desert = table.palette_for(Biome::Desert);
        assert_eq!(desert.wall, Material::SANDSTONE);
        assert!((desert.darkness - 24.0).abs() < f64::EPSILON);
        assert_eq!(desert.floor_features.weights(), vec![1, 3]);
        assert_eq!(table.palette_for(Biome::Badlands), desert);
    }

    #[test]
    fn test_rejects_duplicate_biome() {
        let text = r#"
            [fallback]
            corner = 1
            edge = 1
            wall = 1
            floor = 1

            [[biome]]
            biomes = ["desert"]
            [biome.palette]
            corner = 2
            edge = 2
            wall = 2
            floor = 2

            [[biome]]
            biomes = ["desert"]
            [biome.palette]
            corner = 3
            edge = 3
            wall = 3
            floor = 3
        "#;
        let err = PaletteTable::from_toml_str(text).unwrap_err();
        assert!(matches!(err, CaveError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_negative_scale() {
        let text = r#"
            [fallback]
            corner = 1
            edge = 1
            wall = 1
            floor = 1
            girth_scale = -2.0
        "#;
        assert!(PaletteTable::from_toml_str(text).is_err());
    }

    #[test]
    fn test_default_table_covers_every_biome() {
        let table = PaletteTable::default();
        for biome in Biome::ALL {
            let palette = table.palette_for(biome);
            assert!(palette.spares(SurfaceClass::Interior, Material::CHEST));
            assert!(!palette.material(SurfaceClass::Floor).is_air());
        }
    }

    #[test]
    fn test_feature_pick_maps_blank_to_none() {
        let table = BiomePalette::stone().floor_features;
        assert_eq!(table.pick(0), None);
        assert_eq!(table.pick(1).map(|f| f.kind), Some(FeatureKind::Loot));
        assert_eq!(table.pick(99), None);
    }
}
