//! # Node Decoration
//!
//! At most one vertical feature column per cell, anchored at the cell's
//! node: something on the ceiling of the pocket above the node and
//! something on the floor below it.
//!
//! A cell is only decorated when every connected neighbour node lies within
//! the biome's darkness distance. Tight clusters get lit; long, sparse
//! tunnels stay dark.

use std::ops::Range;

use hollow_geometry::Voxel;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carving::SurfaceClass;
use crate::config::CaveConfig;
use crate::host::VoxelHost;
use crate::material::Material;
use crate::palette::{BiomePalette, FeatureKind, FeatureTable};
use crate::record::Node;
use crate::seed::{stream_for, RngStream, WorldSeed};

/// Which side of the pocket a decoration sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Replaces the first solid block above the node.
    Ceiling,
    /// Rests on the lowest open block below the node.
    Floor,
}

/// One placed decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    /// Ceiling or floor.
    pub placement: Placement,
    /// What was placed.
    pub kind: FeatureKind,
    /// Block written.
    pub material: Material,
    /// Where it was written.
    pub position: Voxel,
}

/// Decorates the pocket at `center`.
///
/// `connected` are the neighbour nodes actually joined to `center` by a
/// tunnel; without any, the node has no pocket and nothing is placed. Both
/// draws are always taken so the ceiling choice never shifts the floor one.
pub fn decorate<H: VoxelHost + ?Sized>(
    host: &mut H,
    seed: WorldSeed,
    config: &CaveConfig,
    palette: &BiomePalette,
    center: &Node,
    connected: &[Node],
) -> Vec<Decoration> {
    let reach = connected
        .iter()
        .map(|n| center.distance(n))
        .reduce(f64::max);
    let Some(reach) = reach else {
        return Vec::new();
    };
    if reach >= palette.darkness {
        debug!(cell = %center.cell, reach, "Node left dark");
        return Vec::new();
    }

    let mut rng = stream_for(seed, RngStream::Decoration, center.cell);
    let ceiling = draw(&palette.ceiling_features, &mut rng);
    let floor = draw(&palette.floor_features, &mut rng);

    let height = host.height_range(center.cell.world);
    let writable = height.start + config.bedrock_margin..height.end;
    let origin = center.position.above();
    if !writable.contains(&origin.y) || !host.block(origin).is_air() {
        return Vec::new();
    }

    let mut placed = Vec::new();
    if let Some((kind, material)) = ceiling {
        if let Some(at) = first_solid(host, origin, 1, config.max_decoration_walk, &writable) {
            let existing = host.block(at);
            if existing.is_carvable() && !palette.spares(SurfaceClass::Wall, existing) {
                host.set_block(at, material);
                placed.push(Decoration {
                    placement: Placement::Ceiling,
                    kind,
                    material,
                    position: at,
                });
            }
        }
    }
    if let Some((kind, material)) = floor {
        let bottom = first_solid(host, origin, -1, config.max_decoration_walk, &writable)
            .map_or(origin, Voxel::above);
        if host.block(bottom).is_air() {
            host.set_block(bottom, material);
            placed.push(Decoration {
                placement: Placement::Floor,
                kind,
                material,
                position: bottom,
            });
        }
    }

    debug!(cell = %center.cell, count = placed.len(), "Decorated node");
    placed
}

fn draw<R: Rng>(table: &FeatureTable, rng: &mut R) -> Option<(FeatureKind, Material)> {
    // an all-zero table places nothing
    let index = WeightedIndex::new(table.weights()).ok()?.sample(rng);
    table.pick(index).map(|f| (f.kind, f.material))
}

/// First non-air voxel above (`step = 1`) or below (`step = -1`) `from`,
/// within `limit` steps and the writable range. Stays in `from`'s column.
fn first_solid<H: VoxelHost + ?Sized>(
    host: &H,
    from: Voxel,
    step: i32,
    limit: u32,
    writable: &Range<i32>,
) -> Option<Voxel> {
    let mut at = from;
    for _ in 0..limit {
        at = at.offset(0, step, 0);
        if !writable.contains(&at.y) {
            return None;
        }
        if !host.block(at).is_air() {
            return Some(at);
        }
    }
    None
}
