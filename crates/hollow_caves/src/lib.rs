//! # HOLLOW Caves
//!
//! Connected tunnel networks carved into a voxel world that is revealed one
//! cell at a time.
//!
//! ## Design Principles
//!
//! 1. **Gated**: a cell is carved only after every neighbour has materialized
//! 2. **Local**: carving writes inside the cell being carved and nowhere else
//! 3. **Deterministic**: every random draw comes from `rng_for(seed, cell)`
//! 4. **Data-driven**: biome materials and spare sets live in a `Palette`
//!
//! ## Core Components
//!
//! - `CellScheduler`: releases cells once their neighbourhood is known
//! - `CarvingEngine`: tunnel geometry, surface classification, materials
//! - `decorate`: lights, hazards, spawners and loot at each node
//! - `CaveNetwork`: per-world context the host drives
//! - `ScheduleStore` / `SaveDebouncer`: compressed, coalesced persistence
//!
//! ## Example
//!
//! ```rust
//! use std::time::Instant;
//! use hollow_caves::{CaveConfig, CaveNetwork, CellCoord, MemoryWorld, PaletteTable, WorldId, WorldSeed};
//!
//! let mut world = MemoryWorld::flat(80);
//! let mut caves = CaveNetwork::new(WorldSeed::new(7), CaveConfig::default(), PaletteTable::default());
//!
//! let mut carved = Vec::new();
//! for x in -1..=1 {
//!     for z in -1..=1 {
//!         let cell = CellCoord::new(x, z, WorldId(0));
//!         world.materialize(cell);
//!         carved.extend(caves.on_cell_materialized(&mut world, cell, Instant::now())?);
//!     }
//! }
//!
//! // only the centre has all eight neighbours
//! assert_eq!(carved.len(), 1);
//! assert_eq!(world.stray_accesses(), 0);
//! # Ok::<(), hollow_caves::CaveError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod carving;
pub mod config;
pub mod decoration;
pub mod error;
pub mod host;
pub mod material;
pub mod network;
pub mod palette;
pub mod persistence;
pub mod record;
pub mod scheduler;
pub mod seed;

pub use carving::{
    classify, interior_neighbor_count, CarveOutcome, CarvingEngine, CellNodes, ClassCounts,
    SurfaceClass, TunnelPlan,
};
pub use config::CaveConfig;
pub use decoration::{decorate, Decoration, Placement};
pub use error::{CaveError, CaveResult};
pub use host::{MemoryWorld, Surface, VoxelHost};
pub use material::{Biome, Environment, Material};
pub use network::{CaveNetwork, CellReport};
pub use palette::{BiomePalette, Feature, FeatureKind, FeatureTable, Palette, PaletteTable, SpareSets};
pub use persistence::{SaveDebouncer, ScheduleStore};
pub use record::{CellRecord, Node};
pub use scheduler::{CellScheduler, CellState, ScheduleSnapshot};
pub use seed::{rng_for, stream_for, RngStream, WorldSeed};

pub use hollow_geometry::{CellCoord, Neighborhood, Region, Voxel, WorldId};
