//! # Deterministic Randomness
//!
//! Every random draw in the cave system comes from `rng_for`, a pure
//! function of the world seed and a cell coordinate. There are no shared
//! or implicitly seeded generators, so a cell's outcome does not depend on
//! the order in which cells load or on which thread carves them.
//!
//! ## Streams
//!
//! Independent decisions about the same cell use different `RngStream`s
//! so that, for example, adding a decoration draw never moves a node.

use hollow_geometry::CellCoord;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// World seed for deterministic generation.
///
/// All procedural decisions derive from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose.
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// Independent random streams drawn for one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RngStream {
    /// Horizontal placement of the cell's node.
    Node,
    /// Node elevation in enclosed worlds.
    Elevation,
    /// Ceiling and floor feature draws.
    Decoration,
}

impl RngStream {
    const fn purpose(self) -> u64 {
        match self {
            Self::Node => 0x4E4F_4445,
            Self::Elevation => 0x454C_4556,
            Self::Decoration => 0x4445_434F,
        }
    }
}

/// SplitMix64 finalizer.
#[inline]
const fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Returns the generator for `cell` under `seed`.
///
/// The same inputs always produce the same sequence.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn rng_for(seed: WorldSeed, cell: CellCoord) -> ChaCha8Rng {
    let mut hash = mix(seed.value());
    hash = mix(hash ^ u64::from(cell.x as u32));
    hash = mix(hash ^ (u64::from(cell.z as u32) << 32));
    hash = mix(hash ^ u64::from(cell.world.0).rotate_left(17));
    ChaCha8Rng::seed_from_u64(hash)
}

/// Returns the generator for one `stream` of `cell` under `seed`.
#[must_use]
pub fn stream_for(seed: WorldSeed, stream: RngStream, cell: CellCoord) -> ChaCha8Rng {
    rng_for(seed.derive(stream.purpose()), cell)
}
