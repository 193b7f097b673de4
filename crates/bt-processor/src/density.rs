//! Decaying density aggregate.
//!
//! Each cell holds a counter and an expiry instant.  An increment resets the
//! expiry to `now + ttl`; a cell whose expiry has passed reads as zero and a
//! later increment starts it again from one.  Expired cells are also removed
//! by [`DensityGrid::sweep`].

use std::time::Duration;

use dashmap::DashMap;

use bt_core::BoundingBox;
use bt_spatial::{GridCell, GridSpec};

#[derive(Copy, Clone, Debug)]
struct Cell {
    count:         u64,
    expires_at_ms: i64,
}

impl Cell {
    #[inline]
    fn live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

pub struct DensityGrid {
    spec:   GridSpec,
    ttl_ms: i64,
    cells:  DashMap<GridCell, Cell>,
}

impl DensityGrid {
    pub fn new(spec: GridSpec, ttl: Duration) -> Self {
        Self {
            spec,
            ttl_ms: ttl.as_millis() as i64,
            cells: DashMap::new(),
        }
    }

    #[inline]
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Count one reading in `cell` at `now_ms`; returns the new count.
    ///
    /// Atomic per cell: concurrent increments of the same cell serialize on
    /// its shard lock and none are lost.
    pub fn increment(&self, cell: GridCell, now_ms: i64) -> u64 {
        let expires_at_ms = now_ms + self.ttl_ms;
        let mut entry = self.cells.entry(cell).or_insert(Cell { count: 0, expires_at_ms });
        if !entry.live(now_ms) {
            entry.count = 0;
        }
        entry.count += 1;
        entry.expires_at_ms = expires_at_ms;
        entry.count
    }

    /// Current count of `cell`; zero once expired.
    pub fn count(&self, cell: GridCell, now_ms: i64) -> u64 {
        self.cells
            .get(&cell)
            .filter(|c| c.live(now_ms))
            .map_or(0, |c| c.count)
    }

    /// Live cells overlapping `bbox`, ordered by cell.
    pub fn cells_in(&self, bbox: &BoundingBox, now_ms: i64) -> Vec<(GridCell, u64)> {
        let mut out: Vec<(GridCell, u64)> = self
            .cells
            .iter()
            .filter(|e| e.value().live(now_ms) && self.spec.intersects(*e.key(), bbox))
            .map(|e| (*e.key(), e.value().count))
            .collect();
        out.sort_unstable_by_key(|&(cell, _)| cell);
        out
    }

    /// Cells held, expired or not.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of live cells.
    pub fn live_cells(&self, now_ms: i64) -> usize {
        self.cells.iter().filter(|e| e.value().live(now_ms)).count()
    }

    /// Drop every expired cell; returns how many were removed.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, c| c.live(now_ms));
        before.saturating_sub(self.cells.len())
    }
}
