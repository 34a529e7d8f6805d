//! # Cell Grid
//!
//! The world is divided into fixed-size horizontal cells ("chunks").
//! A cell spans `CELL_SIZE x CELL_SIZE` blocks horizontally and is
//! unbounded vertically.
//!
//! ## Neighbour Order
//!
//! `CellCoord::ring` returns the 8 surrounding cells in circular order
//! starting at the north-west corner:
//!
//! ```text
//!   NW  N  NE        0 1 2
//!   W   .  E         7 . 3
//!   SW  S  SE        6 5 4
//! ```
//!
//! North is -Z, west is -X.

use std::cmp::Ordering;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Cell width/depth in blocks.
pub const CELL_SIZE: i32 = 16;

/// Ring offsets (dx, dz), circular order from north-west.
const RING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Cardinal offsets (dx, dz): north, west, east, south.
const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Identifies one world (dimension) hosted by the same server.
#[repr(transparent)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Which surrounding cells must be known before a cell is ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// All 8 surrounding cells.
    #[default]
    Moore,
    /// The 4 edge-sharing cells only.
    VonNeumann,
}

impl Neighborhood {
    /// Returns the (dx, dz) offsets of this neighbourhood.
    #[must_use]
    pub const fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Moore => &RING_OFFSETS,
            Self::VonNeumann => &CARDINAL_OFFSETS,
        }
    }
}

/// Cell coordinate (identifies a cell in one world's grid).
///
/// Ordering is lexicographic on `(x, z, world)`.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize,
    Deserialize,
)]
pub struct CellCoord {
    /// X coordinate (in cells, not blocks).
    pub x: i32,
    /// Z coordinate (in cells, not blocks).
    pub z: i32,
    /// World the cell belongs to.
    pub world: WorldId,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32, world: WorldId) -> Self {
        Self { x, z, world }
    }

    /// Returns the cell containing the given block column.
    #[inline]
    #[must_use]
    pub const fn from_block(block_x: i32, block_z: i32, world: WorldId) -> Self {
        Self {
            x: block_x.div_euclid(CELL_SIZE),
            z: block_z.div_euclid(CELL_SIZE),
            world,
        }
    }

    /// Returns the block X coordinate of the cell's origin (corner).
    #[inline]
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.x * CELL_SIZE
    }

    /// Returns the block Z coordinate of the cell's origin.
    #[inline]
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.z * CELL_SIZE
    }

    /// Returns true if the block column `(x, z)` lies inside this cell.
    #[inline]
    #[must_use]
    pub const fn contains_column(self, block_x: i32, block_z: i32) -> bool {
        block_x.div_euclid(CELL_SIZE) == self.x && block_z.div_euclid(CELL_SIZE) == self.z
    }

    /// Returns true if the voxel lies inside this cell's column, in this world.
    #[inline]
    #[must_use]
    pub fn contains(self, voxel: Voxel) -> bool {
        voxel.world == self.world && self.contains_column(voxel.x, voxel.z)
    }

    /// Returns the cell `dx`, `dz` cells away in the same world.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz, self.world)
    }

    /// The 8 surrounding cells in ring order (NW, N, NE, E, SE, S, SW, W).
    #[must_use]
    pub fn ring(self) -> [Self; 8] {
        RING_OFFSETS.map(|(dx, dz)| self.offset(dx, dz))
    }

    /// The 4 edge-sharing cells (N, W, E, S).
    #[must_use]
    pub fn cardinals(self) -> [Self; 4] {
        CARDINAL_OFFSETS.map(|(dx, dz)| self.offset(dx, dz))
    }

    /// The neighbours of this cell under the given neighbourhood.
    pub fn neighbors(self, neighborhood: Neighborhood) -> impl Iterator<Item = Self> {
        neighborhood
            .offsets()
            .iter()
            .map(move |&(dx, dz)| self.offset(dx, dz))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.z, self.world)
    }
}

/// A single block position in one world.
///
/// Ordering is canonical `(x, z, y)`, with the world as the final tiebreak.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Voxel {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate (vertical).
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
    /// World the voxel belongs to.
    pub world: WorldId,
}

impl Voxel {
    /// Creates a new voxel position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32, world: WorldId) -> Self {
        Self { x, y, z, world }
    }

    /// Returns this voxel shifted by the given delta.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz, self.world)
    }

    /// The voxel directly below.
    #[inline]
    #[must_use]
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The voxel directly above.
    #[inline]
    #[must_use]
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// The 6 axis-aligned neighbours (+X, -X, +Y, -Y, +Z, -Z).
    #[must_use]
    pub const fn faces(self) -> [Self; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }

    /// The cell whose column contains this voxel.
    #[inline]
    #[must_use]
    pub const fn cell(self) -> CellCoord {
        CellCoord::from_block(self.x, self.z, self.world)
    }

    /// Euclidean distance to another voxel (worlds are ignored).
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(other.x - self.x);
        let dy = f64::from(other.y - self.y);
        let dz = f64::from(other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Ord for Voxel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .cmp(&other.x)
            .then(self.z.cmp(&other.z))
            .then(self.y.cmp(&other.y))
            .then(self.world.cmp(&other.world))
    }
}

impl PartialOrd for Voxel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Voxel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})@{}", self.x, self.y, self.z, self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: WorldId = WorldId(0);

    #[test]
    fn test_cell_from_block() {
        assert_eq!(CellCoord::from_block(0, 0, W), CellCoord::new(0, 0, W));
        assert_eq!(CellCoord::from_block(15, 15, W), CellCoord::new(0, 0, W));
        assert_eq!(CellCoord::from_block(16, 16, W), CellCoord::new(1, 1, W));
        assert_eq!(CellCoord::from_block(-1, -1, W), CellCoord::new(-1, -1, W));
        assert_eq!(CellCoord::from_block(-16, -16, W), CellCoord::new(-1, -1, W));
        assert_eq!(CellCoord::from_block(-17, -17, W), CellCoord::new(-2, -2, W));
    }

    #[test]
    fn test_contains_column_negative_cells() {
        let cell = CellCoord::new(-1, 0, W);
        assert!(cell.contains_column(-16, 0));
        assert!(cell.contains_column(-1, 15));
        assert!(!cell.contains_column(0, 0));
        assert!(!cell.contains_column(-17, 0));
    }

    #[test]
    fn test_contains_checks_world() {
        let cell = CellCoord::new(0, 0, W);
        assert!(cell.contains(Voxel::new(3, 200, 3, W)));
        assert!(!cell.contains(Voxel::new(3, 200, 3, WorldId(1))));
    }

    #[test]
    fn test_ring_is_circular_and_adjacent() {
        let center = CellCoord::new(4, -2, W);
        let ring = center.ring();

        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            let manhattan = (a.x - b.x).abs() + (a.z - b.z).abs();
            assert_eq!(manhattan, 1, "ring[{i}] and its successor must share an edge");
        }
        assert!(!ring.contains(&center));
    }

    #[test]
    fn test_cardinals_are_subset_of_ring() {
        let center = CellCoord::new(0, 0, W);
        let ring = center.ring();
        for c in center.cardinals() {
            assert!(ring.contains(&c));
        }
    }

    #[test]
    fn test_neighborhood_sizes() {
        let center = CellCoord::new(0, 0, W);
        assert_eq!(center.neighbors(Neighborhood::Moore).count(), 8);
        assert_eq!(center.neighbors(Neighborhood::VonNeumann).count(), 4);
    }

    #[test]
    fn test_voxel_canonical_order() {
        let a = Voxel::new(0, 9, 0, W);
        let b = Voxel::new(0, 0, 1, W);
        let c = Voxel::new(1, 0, 0, W);
        // z is compared before y
        assert!(a < b);
        assert!(b < c);
    }
}
