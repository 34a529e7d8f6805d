//! # Schedule Persistence
//!
//! Cell records must survive restarts: a record captured on first
//! materialization can never be captured again, since by then tunnels may
//! have changed the terrain it was read from.
//!
//! ## Format
//!
//! ```text
//! [magic "HCSS"][version u32][records u32][pending u32]
//! [records: (CellCoord, CellRecord) x N][pending: CellCoord x M]
//! ```
//!
//! All integers are little-endian plain-old-data; the whole payload is
//! LZ4-compressed with its size prepended.
//!
//! ## Debouncing
//!
//! Saves are requested after every registration but written at most once
//! per window. `SaveDebouncer` is polled with the caller's clock; it owns
//! no timer.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use hollow_geometry::CellCoord;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use tracing::{debug, info};

use crate::error::{CaveError, CaveResult};
use crate::record::CellRecord;
use crate::scheduler::ScheduleSnapshot;

/// File magic.
pub const MAGIC: [u8; 4] = *b"HCSS";

/// Current format version.
pub const VERSION: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Header {
    magic: [u8; 4],
    version: u32,
    records: u32,
    pending: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RecordEntry {
    cell: CellCoord,
    record: CellRecord,
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();
const ENTRY_SIZE: usize = std::mem::size_of::<RecordEntry>();
const COORD_SIZE: usize = std::mem::size_of::<CellCoord>();

/// Encodes a snapshot into the compressed binary format.
///
/// # Errors
///
/// Returns `CaveError::Persistence` if a count does not fit the header.
pub fn encode(snapshot: &ScheduleSnapshot) -> CaveResult<Vec<u8>> {
    let count = |n: usize| {
        u32::try_from(n).map_err(|_| CaveError::Persistence {
            reason: format!("{n} entries exceed the snapshot format"),
        })
    };
    let header = Header {
        magic: MAGIC,
        version: VERSION,
        records: count(snapshot.records.len())?,
        pending: count(snapshot.pending.len())?,
    };

    let entries: Vec<RecordEntry> = snapshot
        .records
        .iter()
        .map(|&(cell, record)| RecordEntry { cell, record })
        .collect();

    let mut raw = Vec::with_capacity(
        HEADER_SIZE + entries.len() * ENTRY_SIZE + snapshot.pending.len() * COORD_SIZE,
    );
    raw.extend_from_slice(bytemuck::bytes_of(&header));
    raw.extend_from_slice(bytemuck::cast_slice(&entries));
    raw.extend_from_slice(bytemuck::cast_slice(&snapshot.pending));
    Ok(compress_prepend_size(&raw))
}

/// Decodes a snapshot.
///
/// # Errors
///
/// Returns `CaveError::CorruptSnapshot` on bad compression, magic, version
/// or length, or if a pending cell has no record.
pub fn decode(bytes: &[u8]) -> CaveResult<ScheduleSnapshot> {
    let raw = decompress_size_prepended(bytes)
        .map_err(|e| CaveError::CorruptSnapshot(e.to_string()))?;

    let head = raw
        .get(..HEADER_SIZE)
        .ok_or_else(|| CaveError::CorruptSnapshot("truncated header".to_string()))?;
    let header: Header = bytemuck::pod_read_unaligned(head);
    if header.magic != MAGIC {
        return Err(CaveError::CorruptSnapshot("bad magic".to_string()));
    }
    if header.version != VERSION {
        return Err(CaveError::CorruptSnapshot(format!(
            "unsupported version {}",
            header.version
        )));
    }

    let records = header.records as usize;
    let pending = header.pending as usize;
    let expected = HEADER_SIZE + records * ENTRY_SIZE + pending * COORD_SIZE;
    if raw.len() != expected {
        return Err(CaveError::CorruptSnapshot(format!(
            "expected {expected} bytes, found {}",
            raw.len()
        )));
    }

    let body = &raw[HEADER_SIZE..];
    let (record_bytes, pending_bytes) = body.split_at(records * ENTRY_SIZE);
    let snapshot = ScheduleSnapshot {
        records: record_bytes
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| {
                let entry: RecordEntry = bytemuck::pod_read_unaligned(chunk);
                (entry.cell, entry.record)
            })
            .collect(),
        pending: pending_bytes
            .chunks_exact(COORD_SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect(),
    };

    let mut known: Vec<CellCoord> = snapshot.records.iter().map(|(c, _)| *c).collect();
    known.sort_unstable();
    if let Some(orphan) = snapshot
        .pending
        .iter()
        .find(|c| known.binary_search(*c).is_err())
    {
        return Err(CaveError::CorruptSnapshot(format!(
            "pending cell {orphan} has no record"
        )));
    }
    Ok(snapshot)
}

/// A snapshot file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    /// A store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `snapshot`, replacing any previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::Persistence` if the file cannot be written.
    pub fn save(&self, snapshot: &ScheduleSnapshot) -> CaveResult<()> {
        let bytes = encode(snapshot)?;
        let staging = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&staging, &bytes)?;
        std::fs::rename(&staging, &self.path)?;
        info!(
            path = %self.path.display(),
            records = snapshot.records.len(),
            pending = snapshot.pending.len(),
            bytes = bytes.len(),
            "Saved schedule"
        );
        Ok(())
    }

    /// Reads the snapshot, or `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::Persistence` on I/O failure and
    /// `CaveError::CorruptSnapshot` if the file does not decode.
    pub fn load(&self) -> CaveResult<Option<ScheduleSnapshot>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved schedule");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        decode(&bytes).map(Some)
    }
}

/// Coalesces save requests into one write per window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveDebouncer {
    window: Duration,
    dirty_since: Option<Instant>,
}

impl SaveDebouncer {
    /// A debouncer with the given window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            dirty_since: None,
        }
    }

    /// Requests a save. Only the first request of a window starts the clock.
    pub fn mark_dirty(&mut self, now: Instant) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(now);
        }
    }

    /// Returns true if a save is requested but not yet written.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Returns true, once, when the window since the first request elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.dirty_since {
            Some(since) if now.saturating_duration_since(since) >= self.window => {
                self.dirty_since = None;
                true
            }
            _ => false,
        }
    }

    /// Drops any outstanding request.
    pub fn clear(&mut self) {
        self.dirty_since = None;
    }
}
