//! # Host Surface
//!
//! The carving engine never owns world data. Everything it learns about the
//! world, and every block it changes, goes through `VoxelHost`.
//!
//! `MemoryWorld` is a self-contained host: solid terrain defined by a height
//! function, a sparse map of changed blocks, and a record of which cells have
//! materialized. It counts every access that lands in a cell that has not
//! materialized yet, which a real host would answer by generating that cell.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use hollow_geometry::{BlockAccess, CellCoord, Voxel, WorldId};

use crate::material::{Biome, Environment, Material};

/// World queries and block primitives supplied by the host.
pub trait VoxelHost: BlockAccess<Block = Material> {
    /// Y of the topmost solid block in column `(x, z)`.
    fn highest_solid_y(&self, world: WorldId, x: i32, z: i32) -> i32;

    /// Biome of column `(x, z)`.
    fn biome_at(&self, world: WorldId, x: i32, z: i32) -> Biome;

    /// Kind of world.
    fn environment(&self, world: WorldId) -> Environment;

    /// Valid Y range of the world, `start` inclusive, `end` exclusive.
    fn height_range(&self, world: WorldId) -> Range<i32>;
}

/// Terrain surface of a `MemoryWorld`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    /// Same height everywhere.
    Flat(i32),
    /// Triangle-wave hills along X and Z.
    Rolling {
        /// Mean height.
        base: i32,
        /// Peak deviation from `base`.
        amplitude: i32,
        /// Blocks per full wave.
        wavelength: i32,
    },
}

impl Surface {
    fn height(self, x: i32, z: i32) -> i32 {
        match self {
            Self::Flat(h) => h,
            Self::Rolling {
                base,
                amplitude,
                wavelength,
            } => {
                let wavelength = wavelength.max(2);
                let tri = |v: i32| {
                    let p = v.rem_euclid(wavelength);
                    (p.min(wavelength - p) * 4 - wavelength) * amplitude / wavelength / 2
                };
                base + tri(x) + tri(z)
            }
        }
    }
}

/// In-memory host for tests, tools and benchmarks.
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    surface: Surface,
    height: Range<i32>,
    environment: Environment,
    biome: Biome,
    biome_overrides: HashMap<CellCoord, Biome>,
    blocks: HashMap<Voxel, Material>,
    materialized: HashSet<CellCoord>,
    stray_reads: Cell<usize>,
    stray_writes: usize,
    writes_per_cell: HashMap<CellCoord, usize>,
}

impl MemoryWorld {
    /// Default world height (exclusive upper bound).
    pub const DEFAULT_HEIGHT: i32 = 256;

    /// A surface world of uniform biome.
    #[must_use]
    pub fn new(surface: Surface, biome: Biome) -> Self {
        Self {
            surface,
            height: 0..Self::DEFAULT_HEIGHT,
            environment: Environment::Surface,
            biome,
            biome_overrides: HashMap::new(),
            blocks: HashMap::new(),
            materialized: HashSet::new(),
            stray_reads: Cell::new(0),
            stray_writes: 0,
            writes_per_cell: HashMap::new(),
        }
    }

    /// Flat stone up to `height`, plains everywhere.
    #[must_use]
    pub fn flat(height: i32) -> Self {
        Self::new(Surface::Flat(height), Biome::Plains)
    }

    /// Sets the kind of world.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the valid Y range.
    #[must_use]
    pub fn with_height_range(mut self, height: Range<i32>) -> Self {
        self.height = height;
        self
    }

    /// Overrides the biome of one cell.
    pub fn set_biome(&mut self, cell: CellCoord, biome: Biome) {
        self.biome_overrides.insert(cell, biome);
    }

    /// Marks `cell` as materialized; from now on it may be read and written.
    pub fn materialize(&mut self, cell: CellCoord) {
        self.materialized.insert(cell);
    }

    /// Returns true if `cell` has materialized.
    #[must_use]
    pub fn is_materialized(&self, cell: CellCoord) -> bool {
        self.materialized.contains(&cell)
    }

    /// Reads or writes that touched a cell before it materialized.
    #[must_use]
    pub fn stray_accesses(&self) -> usize {
        self.stray_reads.get() + self.stray_writes
    }

    /// Writes that touched a cell before it materialized.
    #[must_use]
    pub const fn stray_writes(&self) -> usize {
        self.stray_writes
    }

    /// Number of block writes that landed in `cell`.
    #[must_use]
    pub fn writes_in(&self, cell: CellCoord) -> usize {
        self.writes_per_cell.get(&cell).copied().unwrap_or(0)
    }

    /// Every voxel whose block differs from generated terrain.
    pub fn changed(&self) -> impl Iterator<Item = (Voxel, Material)> + '_ {
        self.blocks.iter().map(|(v, m)| (*v, *m))
    }

    /// Reads a block without counting it as an access.
    #[must_use]
    pub fn peek(&self, voxel: Voxel) -> Material {
        self.blocks
            .get(&voxel)
            .copied()
            .unwrap_or_else(|| self.generated(voxel))
    }

    fn generated(&self, voxel: Voxel) -> Material {
        if voxel.y <= self.height.start {
            return Material::BEDROCK;
        }
        if voxel.y >= self.height.end {
            return Material::AIR;
        }
        let top = self.surface.height(voxel.x, voxel.z);
        match voxel.y.cmp(&top) {
            std::cmp::Ordering::Less if voxel.y >= top - 3 => Material::DIRT,
            std::cmp::Ordering::Less => Material::STONE,
            std::cmp::Ordering::Equal => Material::GRASS,
            std::cmp::Ordering::Greater => Material::AIR,
        }
    }
}

impl BlockAccess for MemoryWorld {
    type Block = Material;

    fn block(&self, voxel: Voxel) -> Material {
        if !self.materialized.contains(&voxel.cell()) {
            self.stray_reads.set(self.stray_reads.get() + 1);
        }
        self.peek(voxel)
    }

    fn set_block(&mut self, voxel: Voxel, block: Material) {
        let cell = voxel.cell();
        if !self.materialized.contains(&cell) {
            self.stray_writes += 1;
        }
        *self.writes_per_cell.entry(cell).or_insert(0) += 1;
        self.blocks.insert(voxel, block);
    }
}

impl VoxelHost for MemoryWorld {
    fn highest_solid_y(&self, world: WorldId, x: i32, z: i32) -> i32 {
        let probe = Voxel::new(x, self.height.end - 1, z, world);
        (self.height.start..self.height.end)
            .rev()
            .find(|&y| !self.peek(Voxel { y, ..probe }).is_air())
            .unwrap_or(self.height.start)
    }

    fn biome_at(&self, world: WorldId, x: i32, z: i32) -> Biome {
        self.biome_overrides
            .get(&CellCoord::from_block(x, z, world))
            .copied()
            .unwrap_or(self.biome)
    }

    fn environment(&self, _world: WorldId) -> Environment {
        self.environment
    }

    fn height_range(&self, _world: WorldId) -> Range<i32> {
        self.height.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: WorldId = WorldId(0);

    #[test]
    fn test_flat_terrain_layers() {
        let world = MemoryWorld::flat(64);
        assert_eq!(world.peek(Voxel::new(0, 0, 0, W)), Material::BEDROCK);
        assert_eq!(world.peek(Voxel::new(0, 30, 0, W)), Material::STONE);
        assert_eq!(world.peek(Voxel::new(0, 62, 0, W)), Material::DIRT);
        assert_eq!(world.peek(Voxel::new(0, 64, 0, W)), Material::GRASS);
        assert_eq!(world.peek(Voxel::new(0, 65, 0, W)), Material::AIR);
        assert_eq!(world.highest_solid_y(W, 5, -9), 64);
    }

    #[test]
    fn test_rolling_surface_varies_within_amplitude() {
        let surface = Surface::Rolling {
            base: 60,
            amplitude: 8,
            wavelength: 32,
        };
        let heights: Vec<i32> = (0..64).map(|x| surface.height(x, 0)).collect();
        assert!(heights.iter().all(|h| (44..=76).contains(h)));
        assert!(heights.iter().min() != heights.iter().max());
    }

    #[test]
    fn test_stray_writes_are_counted() {
        let mut world = MemoryWorld::flat(64);
        let cell = CellCoord::new(0, 0, W);
        world.materialize(cell);

        world.set_block(Voxel::new(1, 10, 1, W), Material::AIR);
        assert_eq!(world.stray_writes(), 0);
        assert_eq!(world.writes_in(cell), 1);

        world.set_block(Voxel::new(17, 10, 1, W), Material::AIR);
        assert_eq!(world.stray_writes(), 1);

        let _ = world.block(Voxel::new(-1, 10, 1, W));
        assert_eq!(world.stray_accesses(), 2);
        let _ = world.peek(Voxel::new(-1, 10, 1, W));
        assert_eq!(world.stray_accesses(), 2);
    }

    #[test]
    fn test_biome_override_is_per_cell() {
        let mut world = MemoryWorld::flat(64);
        world.set_biome(CellCoord::new(1, 0, W), Biome::Desert);
        assert_eq!(world.biome_at(W, 20, 3), Biome::Desert);
        assert_eq!(world.biome_at(W, 3, 3), Biome::Plains);
    }
}
