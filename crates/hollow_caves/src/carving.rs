//! # Carving Engine
//!
//! Turns the nodes of a ready cell and its neighbours into tunnels.
//!
//! ## Pipeline
//!
//! 1. **Geometry**: spokes from the cell's node to each cardinal neighbour,
//!    plus a ring of segments joining consecutive surrounding nodes. Girth
//!    shrinks with node distance; thin segments are dropped.
//! 2. **Restrict**: only the cell's own column is ever written.
//! 3. **Classify**: each voxel is sorted by how many of its six faces touch
//!    the *unrestricted* tunnel, so a cell boundary never creates a seam.
//! 4. **Assign**: surface classes map through the biome palette; spared
//!    blocks are left alone.
//!
//! Decoration (step 5) lives in `crate::decoration`.

use std::collections::HashSet;
use std::ops::Range;

use hollow_geometry::{CellCoord, Neighborhood, Region, Voxel, VoxelSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CaveConfig;
use crate::error::CaveResult;
use crate::host::VoxelHost;
use crate::palette::Palette;
use crate::record::{CellRecord, Node};
use crate::seed::WorldSeed;

/// Surface role of a tunnel voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceClass {
    /// Three member faces.
    Corner,
    /// Four member faces.
    Edge,
    /// Five member faces, including the one below.
    Wall,
    /// Five member faces, open below.
    Floor,
    /// All six faces are members; carved to open space.
    Interior,
}

impl SurfaceClass {
    /// Every class, in ascending neighbour count.
    pub const ALL: [Self; 5] = [
        Self::Corner,
        Self::Edge,
        Self::Wall,
        Self::Floor,
        Self::Interior,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Corner => 0,
            Self::Edge => 1,
            Self::Wall => 2,
            Self::Floor => 3,
            Self::Interior => 4,
        }
    }
}

/// Number of the six face neighbours of `voxel` that are members.
///
/// Neighbours outside `height` are never members.
#[must_use]
pub fn interior_neighbor_count<S: VoxelSet + ?Sized>(
    voxel: Voxel,
    members: &S,
    height: &Range<i32>,
) -> u8 {
    let mut count = 0;
    for face in voxel.faces() {
        if height.contains(&face.y) && members.includes(face) {
            count += 1;
        }
    }
    count
}

/// Surface class of `voxel`, or `None` if it is not part of the tunnel surface.
#[must_use]
pub fn classify<S: VoxelSet + ?Sized>(
    voxel: Voxel,
    members: &S,
    height: &Range<i32>,
) -> Option<SurfaceClass> {
    match interior_neighbor_count(voxel, members, height) {
        0..=2 => None,
        3 => Some(SurfaceClass::Corner),
        4 => Some(SurfaceClass::Edge),
        5 => {
            let below = voxel.below();
            if height.contains(&below.y) && members.includes(below) {
                Some(SurfaceClass::Wall)
            } else {
                Some(SurfaceClass::Floor)
            }
        }
        _ => Some(SurfaceClass::Interior),
    }
}

/// Voxels written per surface class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts([usize; 5]);

impl ClassCounts {
    /// Count for `class`.
    #[must_use]
    pub const fn get(&self, class: SurfaceClass) -> usize {
        self.0[class.index()]
    }

    /// Sum over all classes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    fn record(&mut self, class: SurfaceClass) {
        self.0[class.index()] += 1;
    }
}

/// Nodes around one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellNodes {
    /// The cell's own node.
    pub center: Node,
    /// Cardinal neighbour nodes (N, W, E, S).
    pub spokes: Vec<Node>,
    /// Surrounding nodes in circular order.
    pub ring: Vec<Node>,
}

/// Tunnel geometry of one cell before restriction.
#[derive(Clone, Debug, PartialEq)]
pub struct TunnelPlan {
    /// Everything the cell's tunnels occupy, across cell borders.
    pub region: Region,
    /// Cardinal neighbours whose spoke survived the girth threshold.
    pub connected: Vec<Node>,
}

/// Outcome of carving one cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CarveOutcome {
    /// Voxels written.
    pub carved: usize,
    /// Voxels skipped because they hold a spared block.
    pub spared: usize,
    /// Writes per surface class.
    pub classes: ClassCounts,
}

/// Builds and applies the tunnels of one cell.
#[derive(Clone, Copy, Debug)]
pub struct CarvingEngine<'a, P: Palette + ?Sized> {
    seed: WorldSeed,
    config: &'a CaveConfig,
    palette: &'a P,
}

impl<'a, P: Palette + ?Sized> CarvingEngine<'a, P> {
    /// Creates an engine for one world.
    #[must_use]
    pub const fn new(seed: WorldSeed, config: &'a CaveConfig, palette: &'a P) -> Self {
        Self {
            seed,
            config,
            palette,
        }
    }

    /// Collects the nodes around `cell` from known records.
    ///
    /// # Errors
    ///
    /// Propagates the first `lookup` failure; the cell must not be carved
    /// while any neighbour record is missing.
    pub fn nodes<F>(&self, cell: CellCoord, mut lookup: F) -> CaveResult<CellNodes>
    where
        F: FnMut(CellCoord) -> CaveResult<CellRecord>,
    {
        let mut node = |c: CellCoord| lookup(c).map(|record| Node::of(self.seed, c, &record));

        let center = node(cell)?;
        let ring_cells: Vec<CellCoord> = match self.config.neighborhood {
            Neighborhood::Moore => cell.ring().to_vec(),
            // circular order of the four edge neighbours
            Neighborhood::VonNeumann => cell
                .ring()
                .into_iter()
                .filter(|c| c.x == cell.x || c.z == cell.z)
                .collect(),
        };
        let ring = ring_cells
            .into_iter()
            .map(&mut node)
            .collect::<CaveResult<Vec<_>>>()?;
        let spokes = cell
            .cardinals()
            .into_iter()
            .map(&mut node)
            .collect::<CaveResult<Vec<_>>>()?;

        Ok(CellNodes {
            center,
            spokes,
            ring,
        })
    }

    /// The segment joining two nodes, or empty when they are too far apart.
    ///
    /// Endpoints are ordered canonically and girth uses the narrower of the
    /// two biomes, so every cell that shares the segment builds it alike.
    pub fn tunnel<H: VoxelHost + ?Sized>(&self, host: &H, a: &Node, b: &Node) -> Region {
        let (start, end) = if a.position <= b.position {
            (a.position, b.position)
        } else {
            (b.position, a.position)
        };
        let scale = self
            .girth_scale(host, start)
            .min(self.girth_scale(host, end));
        let slack = (self.config.max_span - a.distance(b)).max(0.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = (slack.cbrt() * self.config.girth_factor * scale) as u32;
        if width < self.config.min_tunnel_width {
            return Region::empty();
        }
        Region::segment(start, end, width, width.saturating_add(self.config.headroom))
    }

    /// Step 1: spokes plus the ring, unrestricted.
    pub fn plan<H: VoxelHost + ?Sized>(&self, host: &H, nodes: &CellNodes) -> TunnelPlan {
        let mut connected = Vec::new();
        let mut parts = Vec::new();

        for spoke in &nodes.spokes {
            let segment = self.tunnel(host, &nodes.center, spoke);
            if !segment.is_empty() {
                connected.push(*spoke);
                parts.push(segment);
            }
        }

        let n = nodes.ring.len();
        for i in 0..n {
            parts.push(self.tunnel(host, &nodes.ring[i], &nodes.ring[(i + 1) % n]));
        }

        TunnelPlan {
            region: Region::union_all(parts),
            connected,
        }
    }

    /// Steps 2 to 4: restrict, classify and assign materials.
    pub fn apply<H: VoxelHost + ?Sized>(
        &self,
        host: &mut H,
        cell: CellCoord,
        plan: &TunnelPlan,
    ) -> CarveOutcome {
        let height = host.height_range(cell.world);
        let writable = height.start + self.config.bedrock_margin..height.end;
        let members: HashSet<Voxel> = plan.region.voxels().collect();
        let carve = plan.region.clone().restrict_to_cell(cell);

        let mut outcome = CarveOutcome::default();
        for voxel in carve.materialize() {
            if !writable.contains(&voxel.y) {
                continue;
            }
            let Some(class) = classify(voxel, &members, &height) else {
                continue;
            };
            let palette = self
                .palette
                .palette_for(host.biome_at(voxel.world, voxel.x, voxel.z));
            let existing = host.block(voxel);
            if !existing.is_carvable() || palette.spares(class, existing) {
                outcome.spared += 1;
                continue;
            }
            host.set_block(voxel, palette.material(class));
            outcome.carved += 1;
            outcome.classes.record(class);
        }

        debug!(
            cell = %cell,
            carved = outcome.carved,
            spared = outcome.spared,
            corner = outcome.classes.get(SurfaceClass::Corner),
            edge = outcome.classes.get(SurfaceClass::Edge),
            wall = outcome.classes.get(SurfaceClass::Wall),
            floor = outcome.classes.get(SurfaceClass::Floor),
            interior = outcome.classes.get(SurfaceClass::Interior),
            "Carved cell"
        );
        outcome
    }

    fn girth_scale<H: VoxelHost + ?Sized>(&self, host: &H, at: Voxel) -> f64 {
        self.palette
            .palette_for(host.biome_at(at.world, at.x, at.z))
            .girth_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryWorld;
    use crate::material::{Biome, Material};
    use crate::palette::{BiomePalette, PaletteTable, SpareSets};
    use hollow_geometry::{BlockAccess, WorldId};
    use std::collections::BTreeSet;

    const W: WorldId = WorldId(0);
    const ANY_HEIGHT: Range<i32> = i32::MIN..i32::MAX;

    fn v(x: i32, y: i32, z: i32) -> Voxel {
        Voxel::new(x, y, z, W)
    }

    fn cube(size: i32) -> BTreeSet<Voxel> {
        let mut set = BTreeSet::new();
        for x in 0..size {
            for y in 0..size {
                for z in 0..size {
                    set.insert(v(x, y, z));
                }
            }
        }
        set
    }

    fn node(x: i32, y: i32, z: i32) -> Node {
        Node {
            cell: CellCoord::from_block(x, z, W),
            position: v(x, y, z),
        }
    }

    #[test]
    fn test_cube_classes() {
        let members = cube(3);
        assert_eq!(classify(v(1, 1, 1), &members, &ANY_HEIGHT), Some(SurfaceClass::Interior));
        assert_eq!(classify(v(0, 0, 0), &members, &ANY_HEIGHT), Some(SurfaceClass::Corner));
        assert_eq!(classify(v(1, 0, 0), &members, &ANY_HEIGHT), Some(SurfaceClass::Edge));
        assert_eq!(classify(v(1, 0, 1), &members, &ANY_HEIGHT), Some(SurfaceClass::Floor));
        assert_eq!(classify(v(0, 1, 1), &members, &ANY_HEIGHT), Some(SurfaceClass::Wall));
        assert_eq!(classify(v(1, 2, 1), &members, &ANY_HEIGHT), Some(SurfaceClass::Wall));
    }

    #[test]
    fn test_sparse_voxels_are_not_surface() {
        let members: BTreeSet<Voxel> = [v(0, 0, 0), v(1, 0, 0), v(2, 0, 0)].into();
        assert_eq!(interior_neighbor_count(v(1, 0, 0), &members, &ANY_HEIGHT), 2);
        assert_eq!(classify(v(1, 0, 0), &members, &ANY_HEIGHT), None);
    }

    #[test]
    fn test_height_bounds_clamp_neighbours_out() {
        let members = cube(3);
        assert_eq!(interior_neighbor_count(v(1, 1, 1), &members, &(0..2)), 5);
        assert_eq!(classify(v(1, 1, 1), &members, &(1..3)), Some(SurfaceClass::Floor));
    }

    #[test]
    fn test_far_nodes_make_no_tunnel() {
        let world = MemoryWorld::flat(64);
        let config = CaveConfig::default();
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        let far = engine.tunnel(&world, &node(0, 30, 0), &node(40, 30, 0));
        assert!(far.is_empty());

        let near = engine.tunnel(&world, &node(0, 30, 0), &node(12, 30, 0));
        assert!(!near.is_empty());
    }

    #[test]
    fn test_oversized_headroom_makes_no_tunnel() {
        let world = MemoryWorld::flat(64);
        let config = CaveConfig {
            headroom: u32::MAX,
            ..CaveConfig::default()
        };
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        assert!(engine.tunnel(&world, &node(0, 30, 0), &node(12, 30, 0)).is_empty());
    }

    #[test]
    fn test_tunnel_is_symmetric() {
        let world = MemoryWorld::flat(64);
        let config = CaveConfig::default();
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        let a = node(3, 30, 5);
        let b = node(18, 36, 9);
        assert_eq!(engine.tunnel(&world, &a, &b), engine.tunnel(&world, &b, &a));
    }

    #[test]
    fn test_girth_uses_narrower_biome() {
        let mut world = MemoryWorld::flat(64);
        world.set_biome(CellCoord::new(1, 0, W), Biome::Tundra);
        let config = CaveConfig::default();
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        let plains = engine.tunnel(&world, &node(2, 30, 2), &node(14, 30, 2));
        let mixed = engine.tunnel(&world, &node(8, 30, 2), &node(20, 30, 2));
        assert!(mixed.materialize().len() <= plains.materialize().len());
    }

    #[test]
    fn test_apply_writes_only_inside_cell() {
        let mut world = MemoryWorld::flat(100);
        let cell = CellCoord::new(0, 0, W);
        world.materialize(cell);
        let config = CaveConfig::default();
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        let plan = TunnelPlan {
            region: Region::segment(v(-10, 40, 6), v(26, 40, 6), 4, 5),
            connected: Vec::new(),
        };
        let outcome = engine.apply(&mut world, cell, &plan);

        assert!(outcome.carved > 0);
        assert_eq!(world.stray_writes(), 0);
        assert!(world.changed().all(|(voxel, _)| cell.contains(voxel)));
        assert_eq!(outcome.classes.total(), outcome.carved);
    }

    #[test]
    fn test_apply_respects_spare_set() {
        let mut world = MemoryWorld::flat(100);
        let cell = CellCoord::new(0, 0, W);
        world.materialize(cell);
        let ore = v(8, 41, 6);
        world.set_block(ore, Material::DIAMOND_ORE);

        let config = CaveConfig::default();
        let palette = PaletteTable::uniform(BiomePalette {
            spare: SpareSets::uniform(&[Material::DIAMOND_ORE]),
            ..BiomePalette::stone()
        });
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);
        let plan = TunnelPlan {
            region: Region::segment(v(2, 40, 6), v(14, 40, 6), 4, 5),
            connected: Vec::new(),
        };
        let outcome = engine.apply(&mut world, cell, &plan);

        assert!(outcome.spared >= 1);
        assert_eq!(world.block(ore), Material::DIAMOND_ORE);
    }

    #[test]
    fn test_apply_never_touches_bedrock_margin() {
        let mut world = MemoryWorld::flat(100);
        let cell = CellCoord::new(0, 0, W);
        world.materialize(cell);
        let config = CaveConfig::default();
        let palette = PaletteTable::default();
        let engine = CarvingEngine::new(WorldSeed::new(1), &config, &palette);

        let plan = TunnelPlan {
            region: Region::segment(v(2, -2, 6), v(14, -2, 6), 4, 5),
            connected: Vec::new(),
        };
        engine.apply(&mut world, cell, &plan);
        assert!(world.changed().all(|(voxel, _)| voxel.y >= 1));
    }
}
