//! # HOLLOW Geometry
//!
//! Grid and set primitives for carving tunnels into a voxel world that
//! materializes one cell at a time.
//!
//! ## Design Principles
//!
//! 1. **Lazy**: regions describe voxel sets; nothing is enumerated until asked
//! 2. **Exact**: `Region::contains` agrees with `Region::materialize`
//! 3. **Local**: `Region::restrict_to_cell` is the only way carving reaches
//!    the world, so a pass never leaks into a neighbouring cell
//!
//! ## Core Components
//!
//! - `CellCoord`: one horizontal grid cell in one world
//! - `Voxel`: one block position
//! - `Region`: composable voxel sets (segment, union, restrict, translate)
//! - `BlockAccess`: host block read/write primitives used by `Region::fill`

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cell;
pub mod region;

pub use cell::{CellCoord, Neighborhood, Voxel, WorldId, CELL_SIZE};
pub use region::{BlockAccess, Region, VoxelSet, Voxels};
