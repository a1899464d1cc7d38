//! Memory touch jobs
//!
//! In shared mode every job touches a slice of one region owned by the
//! run. The write phase holds the region's write guard; it is then
//! downgraded so the read-back sees exactly what was written while other
//! readers proceed. In release mode each job allocates, fills and drops its
//! own buffer.

use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{RwLock, RwLockWriteGuard};
use rand::Rng;

use crate::error::ConfigError;
use crate::job::{Job, JobContext, JobError, Payload};
use crate::stats::DomainCounters;

const CELL_BYTES: u64 = size_of::<i64>() as u64;

/// Memory region shared by the jobs of one run
#[derive(Debug)]
pub struct MemoryRegion {
    cells: RwLock<Vec<i64>>,
}

impl MemoryRegion {
    /// Allocate a zeroed region of `len` cells
    pub fn new(len: usize) -> Result<Self, ConfigError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| ConfigError::Allocation {
                cells: len,
                reason: e.to_string(),
            })?;
        cells.resize(len, 0);

        Ok(Self {
            cells: RwLock::new(cells),
        })
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the cells in `start..start + len`
    pub fn snapshot(&self, start: usize, len: usize) -> Vec<i64> {
        let cells = self.cells.read();
        cells
            .get(start..start.saturating_add(len))
            .map(<[i64]>::to_vec)
            .unwrap_or_default()
    }

    /// Increment every cell of the slice, then optionally read it back
    pub fn touch(&self, slice: MemorySlice, read: bool) -> Result<MemoryTouch, JobError> {
        let mut cells = self.cells.write();
        let end = slice
            .end()
            .filter(|end| *end <= cells.len())
            .ok_or_else(|| {
                JobError::Invalid(format!(
                    "slice {}..+{} outside region of {} cells",
                    slice.start,
                    slice.len,
                    cells.len()
                ))
            })?;

        for cell in &mut cells[slice.start..end] {
            *cell = cell.wrapping_add(1);
        }
        let bytes_written = slice.len as u64 * CELL_BYTES;

        if !read {
            return Ok(MemoryTouch {
                bytes_written,
                bytes_read: 0,
                magic: None,
            });
        }

        let cells = RwLockWriteGuard::downgrade(cells);
        let magic = cells[slice.start..end]
            .iter()
            .fold(0i64, |acc, v| acc.wrapping_add(*v));

        Ok(MemoryTouch {
            bytes_written,
            bytes_read: bytes_written,
            magic: Some(magic),
        })
    }
}

/// A slice of memory cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySlice {
    pub start: usize,
    pub len: usize,
}

impl MemorySlice {
    fn end(&self) -> Option<usize> {
        self.start.checked_add(self.len)
    }
}

/// Outcome of one memory job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTouch {
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Sum of the slice after writing, when read-back is enabled
    pub magic: Option<i64>,
}

impl fmt::Display for MemoryTouch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote: {} bytes, Read: {} bytes",
            self.bytes_written, self.bytes_read
        )?;
        if let Some(magic) = self.magic {
            write!(f, ", MagicNumber: {}", magic)?;
        }
        Ok(())
    }
}

impl Payload for MemoryTouch {
    fn tally(&self, counters: &mut DomainCounters) {
        counters.add_written(self.bytes_written);
        counters.add_read(self.bytes_read);
    }
}

fn touch_private(slice: MemorySlice, read: bool) -> Result<MemoryTouch, JobError> {
    let end = slice
        .end()
        .ok_or_else(|| JobError::Invalid("slice end overflows".to_string()))?;

    let mut buffer: Vec<i64> = Vec::new();
    buffer.try_reserve_exact(slice.len).map_err(|e| {
        JobError::Invalid(format!("cannot allocate {} cells: {}", slice.len, e))
    })?;
    buffer.extend((slice.start..end).map(|i| i as i64));
    let bytes_written = buffer.len() as u64 * CELL_BYTES;

    let magic = read.then(|| buffer.iter().fold(0i64, |acc, v| acc.wrapping_add(*v)));
    drop(buffer);

    Ok(MemoryTouch {
        bytes_written,
        bytes_read: if read { bytes_written } else { 0 },
        magic,
    })
}

/// Where a memory job writes
#[derive(Debug, Clone)]
pub enum MemoryMode {
    /// Touch the run's shared region
    Shared(Arc<MemoryRegion>),
    /// Allocate and free a private buffer per job
    Release,
}

/// Touches a random slice of memory per dispatch
///
/// Sizes are counted in cells (one `i64` value each); byte counters report
/// `cells * 8`.
#[derive(Debug)]
pub struct MemoryJob {
    mode: MemoryMode,
    cells: usize,
    window: usize,
    read: bool,
}

impl MemoryJob {
    /// Jobs touching one shared region of `cells` values
    pub fn shared(cells: usize, ceiling: usize, read: bool) -> Result<Self, ConfigError> {
        let region = Arc::new(MemoryRegion::new(cells)?);
        Ok(Self::build(MemoryMode::Shared(region), cells, ceiling, read))
    }

    /// Jobs allocating private buffers drawn from a space of `cells` values
    pub fn release(cells: usize, ceiling: usize, read: bool) -> Self {
        Self::build(MemoryMode::Release, cells, ceiling, read)
    }

    fn build(mode: MemoryMode, cells: usize, ceiling: usize, read: bool) -> Self {
        Self {
            mode,
            cells,
            window: (cells / ceiling.max(1)).max(1),
            read,
        }
    }

    /// The shared region, if any
    pub fn region(&self) -> Option<&Arc<MemoryRegion>> {
        match &self.mode {
            MemoryMode::Shared(region) => Some(region),
            MemoryMode::Release => None,
        }
    }

    /// Number of cells jobs draw slices from
    pub fn cells(&self) -> usize {
        self.cells
    }
}

#[async_trait]
impl Job for MemoryJob {
    const KIND: &'static str = "mem";
    type Input = MemorySlice;
    type Output = MemoryTouch;

    fn next_input(&self) -> Self::Input {
        let mut rng = rand::thread_rng();
        let len = rng.gen_range(0..self.window).min(self.cells);
        let start = rng.gen_range(0..=self.cells - len);
        MemorySlice { start, len }
    }

    async fn execute(&self, _ctx: &JobContext, slice: MemorySlice) -> Result<MemoryTouch, JobError> {
        let read = self.read;
        match &self.mode {
            MemoryMode::Shared(region) => {
                let region = Arc::clone(region);
                tokio::task::spawn_blocking(move || region.touch(slice, read)).await?
            }
            MemoryMode::Release => {
                tokio::task::spawn_blocking(move || touch_private(slice, read)).await?
            }
        }
    }
}
