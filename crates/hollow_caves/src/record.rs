//! # Cell Records and Nodes
//!
//! A `CellRecord` is captured once, the moment a cell first materializes,
//! and never changes afterwards. Together with the world seed it fixes the
//! cell's tunnel node: a point at a seeded horizontal offset inside the cell,
//! at the recorded elevation.

use bytemuck::{Pod, Zeroable};
use hollow_geometry::{CellCoord, Voxel, CELL_SIZE};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CaveConfig;
use crate::host::VoxelHost;
use crate::material::Environment;
use crate::palette::Palette;
use crate::seed::{stream_for, RngStream, WorldSeed};

/// Immutable per-cell data captured on first materialization.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct CellRecord {
    /// Topmost solid voxel in the node's column.
    pub highest_surface_y: i32,
    /// Y of the cell's tunnel node.
    pub node_elevation: i32,
}

impl CellRecord {
    /// Creates a record from raw values.
    #[inline]
    #[must_use]
    pub const fn new(highest_surface_y: i32, node_elevation: i32) -> Self {
        Self {
            highest_surface_y,
            node_elevation,
        }
    }

    /// Captures the record of `cell` from the host.
    ///
    /// Only the node's own column is read, so this never reaches outside
    /// `cell`. Surface worlds place the node at `node_depth` of the surface
    /// height; enclosed worlds draw it from the configured band.
    pub fn capture<H, P>(
        host: &H,
        seed: WorldSeed,
        config: &CaveConfig,
        palette: &P,
        cell: CellCoord,
    ) -> Self
    where
        H: VoxelHost + ?Sized,
        P: Palette + ?Sized,
    {
        let probe = Node::perturbed(seed, cell, 0).position;
        let highest = host.highest_solid_y(cell.world, probe.x, probe.z);
        let biome = host.biome_at(cell.world, probe.x, probe.z);
        let range = host.height_range(cell.world);

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let elevation = match host.environment(cell.world) {
            Environment::Surface => {
                (f64::from(highest) * palette.palette_for(biome).node_depth).floor() as i32
            }
            Environment::Enclosed => {
                let mut rng = stream_for(seed, RngStream::Elevation, cell);
                config.enclosed_node_min + rng.gen_range(0..config.enclosed_node_span) as i32
            }
        };

        let floor = range.start + config.bedrock_margin;
        let ceiling = (range.end - 1).max(floor);
        Self::new(highest, elevation.clamp(floor, ceiling))
    }
}

/// A cell's tunnel anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    /// Owning cell.
    pub cell: CellCoord,
    /// Anchor voxel, always inside `cell`.
    pub position: Voxel,
}

impl Node {
    /// The node of `cell` at height `y`, horizontally offset by a seeded draw.
    #[must_use]
    pub fn perturbed(seed: WorldSeed, cell: CellCoord, y: i32) -> Self {
        let mut rng = stream_for(seed, RngStream::Node, cell);
        let dx = rng.gen_range(0..CELL_SIZE);
        let dz = rng.gen_range(0..CELL_SIZE);
        Self {
            cell,
            position: Voxel::new(
                cell.min_block_x() + dx,
                y,
                cell.min_block_z() + dz,
                cell.world,
            ),
        }
    }

    /// The node of `cell` at its recorded elevation.
    #[must_use]
    pub fn of(seed: WorldSeed, cell: CellCoord, record: &CellRecord) -> Self {
        Self::perturbed(seed, cell, record.node_elevation)
    }

    /// Distance to another node.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.position.distance(other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryWorld;
    use crate::palette::PaletteTable;
    use hollow_geometry::WorldId;

    const W: WorldId = WorldId(0);

    #[test]
    fn test_node_stays_inside_cell() {
        let seed = WorldSeed::new(99);
        for x in -3..3 {
            for z in -3..3 {
                let cell = CellCoord::new(x, z, W);
                let node = Node::perturbed(seed, cell, 40);
                assert!(cell.contains(node.position));
                assert_eq!(node.position.y, 40);
            }
        }
    }

    #[test]
    fn test_node_is_deterministic() {
        let seed = WorldSeed::new(5);
        let cell = CellCoord::new(4, -2, W);
        assert_eq!(Node::perturbed(seed, cell, 10), Node::perturbed(seed, cell, 10));
        assert_eq!(
            Node::perturbed(seed, cell, 10).position.x,
            Node::perturbed(seed, cell, 70).position.x
        );
    }

    #[test]
    fn test_capture_surface_world_uses_half_height() {
        let world = MemoryWorld::flat(64);
        let record = CellRecord::capture(
            &world,
            WorldSeed::new(1),
            &CaveConfig::default(),
            &PaletteTable::default(),
            CellCoord::new(0, 0, W),
        );
        assert_eq!(record, CellRecord::new(64, 32));
    }

    #[test]
    fn test_capture_enclosed_world_draws_from_band() {
        let world = MemoryWorld::flat(120).with_environment(Environment::Enclosed);
        let config = CaveConfig::default();
        for x in 0..16 {
            let record = CellRecord::capture(
                &world,
                WorldSeed::new(3),
                &config,
                &PaletteTable::default(),
                CellCoord::new(x, 0, W),
            );
            let band = config.enclosed_node_min
                ..config.enclosed_node_min + config.enclosed_node_span as i32;
            assert!(band.contains(&record.node_elevation));
        }
    }

    #[test]
    fn test_capture_clamps_above_bedrock() {
        let world = MemoryWorld::flat(1);
        let record = CellRecord::capture(
            &world,
            WorldSeed::new(1),
            &CaveConfig::default(),
            &PaletteTable::default(),
            CellCoord::new(0, 0, W),
        );
        assert_eq!(record.node_elevation, 1);
    }
}
