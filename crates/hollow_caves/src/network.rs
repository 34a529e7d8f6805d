//! # Cave Network
//!
//! One `CaveNetwork` per world. It owns the schedule and the palette, and is
//! driven entirely by the host:
//!
//! ```text
//! host: cell materialized --> on_cell_materialized
//!                               |- capture + register record
//!                               |- drain ready cells
//!                               |- carve + decorate each, in order
//!                               |- mark each carved
//!                               '- request a save
//! host: tick                --> poll_save
//! host: shutdown            --> save_now
//! ```
//!
//! Everything runs on the caller's thread; a batch of ready cells is
//! processed strictly one after another.

use std::time::Instant;

use hollow_geometry::CellCoord;
use tracing::{info, warn};

use crate::carving::{CarvingEngine, ClassCounts};
use crate::config::CaveConfig;
use crate::decoration::{decorate, Decoration};
use crate::error::{CaveError, CaveResult};
use crate::host::VoxelHost;
use crate::palette::{Palette, PaletteTable};
use crate::persistence::{SaveDebouncer, ScheduleStore};
use crate::record::CellRecord;
use crate::scheduler::{CellScheduler, CellState};
use crate::seed::WorldSeed;

/// What happened to one carved cell.
///
/// Spawner and loot placements are listed so the host can fill them.
#[derive(Clone, Debug, PartialEq)]
pub struct CellReport {
    /// The carved cell.
    pub cell: CellCoord,
    /// Voxels written by carving.
    pub carved: usize,
    /// Voxels skipped because they hold a spared block.
    pub spared: usize,
    /// Carving writes per surface class.
    pub classes: ClassCounts,
    /// Placed decorations.
    pub decorations: Vec<Decoration>,
}

/// Scheduler, palette and persistence for one world.
#[derive(Debug)]
pub struct CaveNetwork<P: Palette = PaletteTable> {
    seed: WorldSeed,
    config: CaveConfig,
    palette: P,
    scheduler: CellScheduler,
    debouncer: SaveDebouncer,
    store: Option<ScheduleStore>,
}

impl<P: Palette> CaveNetwork<P> {
    /// A network with an empty schedule and no store.
    #[must_use]
    pub fn new(seed: WorldSeed, config: CaveConfig, palette: P) -> Self {
        Self {
            seed,
            scheduler: CellScheduler::new(config.neighborhood),
            debouncer: SaveDebouncer::new(config.save_debounce()),
            config,
            palette,
            store: None,
        }
    }

    /// Attaches a store for `poll_save` and `save_now`.
    #[must_use]
    pub fn with_store(mut self, store: ScheduleStore) -> Self {
        self.store = Some(store);
        self
    }

    /// A network backed by `store`, resuming its saved schedule if any.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the snapshot cannot be read or decoded.
    pub fn open(
        seed: WorldSeed,
        config: CaveConfig,
        palette: P,
        store: ScheduleStore,
    ) -> CaveResult<Self> {
        let mut network = Self::new(seed, config, palette);
        if let Some(snapshot) = store.load()? {
            network.scheduler = CellScheduler::restore(network.config.neighborhood, snapshot)?;
            info!(
                path = %store.path().display(),
                known = network.scheduler.known_count(),
                pending = network.scheduler.pending_count(),
                "Restored schedule"
            );
        }
        Ok(network.with_store(store))
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CaveConfig {
        &self.config
    }

    /// The palette.
    #[must_use]
    pub const fn palette(&self) -> &P {
        &self.palette
    }

    /// The schedule.
    #[must_use]
    pub const fn scheduler(&self) -> &CellScheduler {
        &self.scheduler
    }

    /// Entry point: `cell` has just materialized in `host`.
    ///
    /// Cells that are already known (for example after a restart) are
    /// ignored. Returns a report for every cell carved as a result.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::PreconditionViolation` if a released cell could
    /// not see all of its neighbours. The pass stops there; that cell and
    /// every cell after it in the batch go back to pending.
    pub fn on_cell_materialized<H: VoxelHost + ?Sized>(
        &mut self,
        host: &mut H,
        cell: CellCoord,
        now: Instant,
    ) -> CaveResult<Vec<CellReport>> {
        if self.scheduler.is_known(cell) {
            return Ok(Vec::new());
        }
        let record = CellRecord::capture(host, self.seed, &self.config, &self.palette, cell);
        self.scheduler.register(cell, record)?;
        self.debouncer.mark_dirty(now);

        let ready = self.scheduler.drain_ready();
        let mut reports = Vec::with_capacity(ready.len());
        for (i, &next) in ready.iter().enumerate() {
            match self.carve_cell(host, next) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    for &rest in &ready[i + 1..] {
                        self.scheduler.requeue(rest)?;
                    }
                    warn!(cell = %next, error = %e, "Carving pass aborted");
                    return Err(e);
                }
            }
        }
        Ok(reports)
    }

    /// Carves and decorates one cell handed out by the scheduler, then marks
    /// it carved.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::PreconditionViolation` if `cell` is not released
    /// (still pending, or already carved) or if a neighbour record is
    /// missing. Nothing is written in either case; a released cell goes
    /// back to pending.
    pub fn carve_cell<H: VoxelHost + ?Sized>(
        &mut self,
        host: &mut H,
        cell: CellCoord,
    ) -> CaveResult<CellReport> {
        if self.scheduler.state(cell) != CellState::Released {
            return Err(CaveError::precondition(cell, "cell was not released for carving"));
        }
        match self.carve_released(host, cell) {
            Ok(report) => {
                self.scheduler.finish(cell)?;
                Ok(report)
            }
            Err(e) => {
                self.scheduler.requeue(cell)?;
                Err(e)
            }
        }
    }

    fn carve_released<H: VoxelHost + ?Sized>(
        &self,
        host: &mut H,
        cell: CellCoord,
    ) -> CaveResult<CellReport> {
        let engine = CarvingEngine::new(self.seed, &self.config, &self.palette);
        let nodes = engine.nodes(cell, |c| self.scheduler.lookup(c))?;
        let plan = engine.plan(host, &nodes);
        let outcome = engine.apply(host, cell, &plan);

        let anchor = nodes.center.position;
        let biome = host.biome_at(cell.world, anchor.x, anchor.z);
        let decorations = decorate(
            host,
            self.seed,
            &self.config,
            self.palette.palette_for(biome),
            &nodes.center,
            &plan.connected,
        );

        Ok(CellReport {
            cell,
            carved: outcome.carved,
            spared: outcome.spared,
            classes: outcome.classes,
            decorations,
        })
    }

    /// Writes the schedule if a save is due. Returns true if it wrote.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::Persistence` if the write failed; the save is
    /// requested again.
    pub fn poll_save(&mut self, now: Instant) -> CaveResult<bool> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        self.save_now().map_err(|e| {
            self.debouncer.mark_dirty(now);
            e
        })
    }

    /// Writes the schedule immediately. Returns false if there is no store.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::Persistence` if the write failed.
    pub fn save_now(&mut self) -> CaveResult<bool> {
        let Some(store) = &self.store else {
            self.debouncer.clear();
            return Ok(false);
        };
        match store.save(&self.scheduler.snapshot()) {
            Ok(()) => {
                self.debouncer.clear();
                Ok(true)
            }
            Err(e) => {
                warn!(path = %store.path().display(), error = %e, "Schedule save failed");
                Err(e)
            }
        }
    }
}
