//! # Cell Scheduler
//!
//! Decides when a cell may be carved. A cell is registered the moment it
//! materializes and released once every cell in its neighbourhood is known,
//! so carving never has to read a neighbour that does not exist yet.
//!
//! ## Lifecycle
//!
//! ```text
//! Unknown --register--> Pending --drain_ready--> Released --finish--> Carved
//!                          ^                        |
//!                          '--------requeue---------'
//! ```
//!
//! A cell is carved at most once. Records are never overwritten. Released
//! cells are saved as pending, so a cell interrupted between release and
//! carving is released again after a restart.

use std::collections::{BTreeSet, HashMap};

use hollow_geometry::{CellCoord, Neighborhood};
use tracing::{debug, warn};

use crate::error::{CaveError, CaveResult};
use crate::record::CellRecord;

/// Where a cell is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Never registered.
    Unknown,
    /// Registered, waiting for its neighbours.
    Pending,
    /// Handed out by `drain_ready`, not yet carved.
    Released,
    /// Carved and decorated; never revisited.
    Carved,
}

/// Persistable scheduler state.
///
/// Both vectors are sorted by coordinate, so equal schedules produce equal
/// snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    /// Every known cell with its record.
    pub records: Vec<(CellCoord, CellRecord)>,
    /// Cells registered but not yet carved.
    pub pending: Vec<CellCoord>,
}

/// Tracks known cells and releases them once their neighbourhood is known.
#[derive(Clone, Debug)]
pub struct CellScheduler {
    neighborhood: Neighborhood,
    known: HashMap<CellCoord, CellRecord>,
    pending: BTreeSet<CellCoord>,
    released: BTreeSet<CellCoord>,
}

impl CellScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new(neighborhood: Neighborhood) -> Self {
        Self {
            neighborhood,
            known: HashMap::new(),
            pending: BTreeSet::new(),
            released: BTreeSet::new(),
        }
    }

    /// The readiness neighbourhood.
    #[must_use]
    pub const fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Records `cell` as known and queues it for carving.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::AlreadyKnown` if `cell` was registered before;
    /// the stored record is kept.
    pub fn register(&mut self, cell: CellCoord, record: CellRecord) -> CaveResult<()> {
        if self.known.contains_key(&cell) {
            warn!(cell = %cell, "Rejected re-registration");
            return Err(CaveError::AlreadyKnown(cell));
        }
        self.known.insert(cell, record);
        self.pending.insert(cell);
        debug!(
            cell = %cell,
            node_elevation = record.node_elevation,
            pending = self.pending.len(),
            "Registered cell"
        );
        Ok(())
    }

    /// The record of a known cell.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::PreconditionViolation` if `cell` is not known.
    pub fn lookup(&self, cell: CellCoord) -> CaveResult<CellRecord> {
        self.known
            .get(&cell)
            .copied()
            .ok_or_else(|| CaveError::precondition(cell, "cell record is not known"))
    }

    /// Returns true if `cell` has a record.
    #[must_use]
    pub fn is_known(&self, cell: CellCoord) -> bool {
        self.known.contains_key(&cell)
    }

    /// Lifecycle state of `cell`.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> CellState {
        if self.pending.contains(&cell) {
            CellState::Pending
        } else if self.released.contains(&cell) {
            CellState::Released
        } else if self.known.contains_key(&cell) {
            CellState::Carved
        } else {
            CellState::Unknown
        }
    }

    /// Returns true if every neighbour of `cell` is known.
    #[must_use]
    pub fn neighbors_known(&self, cell: CellCoord) -> bool {
        cell.neighbors(self.neighborhood)
            .all(|n| self.known.contains_key(&n))
    }

    /// Removes and returns every pending cell whose neighbourhood is known,
    /// in coordinate order.
    pub fn drain_ready(&mut self) -> Vec<CellCoord> {
        let ready: Vec<CellCoord> = self
            .pending
            .iter()
            .copied()
            .filter(|&cell| self.neighbors_known(cell))
            .collect();
        for &cell in &ready {
            self.pending.remove(&cell);
            self.released.insert(cell);
        }
        if !ready.is_empty() {
            debug!(count = ready.len(), pending = self.pending.len(), "Drained ready cells");
        }
        ready
    }

    /// Marks a released cell as carved.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::PreconditionViolation` if `cell` is not currently
    /// released; its state is unchanged.
    pub fn finish(&mut self, cell: CellCoord) -> CaveResult<()> {
        if !self.released.remove(&cell) {
            return Err(CaveError::precondition(cell, "cell was not released for carving"));
        }
        Ok(())
    }

    /// Puts a released cell back in the queue after a failed pass.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::PreconditionViolation` if `cell` is not currently
    /// released.
    pub fn requeue(&mut self, cell: CellCoord) -> CaveResult<()> {
        if !self.released.remove(&cell) {
            return Err(CaveError::precondition(cell, "cell was not released for carving"));
        }
        self.pending.insert(cell);
        debug!(cell = %cell, pending = self.pending.len(), "Requeued cell");
        Ok(())
    }

    /// Number of known cells.
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Number of cells waiting for neighbours.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of cells released but not yet carved.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Copies the state out for persistence.
    #[must_use]
    pub fn snapshot(&self) -> ScheduleSnapshot {
        let mut records: Vec<(CellCoord, CellRecord)> =
            self.known.iter().map(|(c, r)| (*c, *r)).collect();
        records.sort_unstable_by_key(|(c, _)| *c);
        ScheduleSnapshot {
            records,
            pending: self.pending.union(&self.released).copied().collect(),
        }
    }

    /// Rebuilds a scheduler from a snapshot. Known cells that are not
    /// pending come back as carved.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::CorruptSnapshot` if a cell appears twice or a
    /// pending cell has no record.
    pub fn restore(neighborhood: Neighborhood, snapshot: ScheduleSnapshot) -> CaveResult<Self> {
        let mut known = HashMap::with_capacity(snapshot.records.len());
        for (cell, record) in snapshot.records {
            if known.insert(cell, record).is_some() {
                return Err(CaveError::CorruptSnapshot(format!("duplicate record for {cell}")));
            }
        }
        let mut pending = BTreeSet::new();
        for cell in snapshot.pending {
            if !known.contains_key(&cell) {
                return Err(CaveError::CorruptSnapshot(format!(
                    "pending cell {cell} has no record"
                )));
            }
            pending.insert(cell);
        }
        Ok(Self {
            neighborhood,
            known,
            pending,
            released: BTreeSet::new(),
        })
    }
}
