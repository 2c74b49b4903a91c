//! Pure Game of Life core: an id-addressed grid and a side-effect-free
//! step function that reports only the cells whose state changed.
//!
//! The grid is bounded (no toroidal wrapping): a neighbor position outside
//! the grid, or past the end of its row, contributes 0. Rows may have
//! different lengths; every neighbor lookup bounds-checks against its own
//! row. Shape is fixed at construction - only `alive` flags change during
//! a run, and reshaping means building a new grid.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Opaque, stable cell identifier. Does not encode position: neighbor
/// relationships come from the grid's row/column indices, never from the id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        CellId(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// A single changed cell: the id and its new state. Unchanged cells are
/// never reported, so applying a diff list touches the minimum set of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellDiff {
    pub id: CellId,
    pub alive: bool,
}

struct Cell {
    id: CellId,
    alive: bool,
}

/// Grid of cells addressed both by (row, col) position and by stable id.
///
/// Internally an arena of cell states plus a row/column table mapping each
/// position to its arena slot, and a reverse index from id to slot.
pub struct Grid {
    rows: Vec<Vec<usize>>,
    cells: Vec<Cell>,
    by_id: HashMap<CellId, usize>,
}

impl Grid {
    /// Build a grid of the given shape with every cell dead.
    pub fn cleared(row_count: usize, col_count: usize) -> Self {
        Self::build(row_count, col_count, |_| false)
    }

    /// Build a grid of the given shape where each cell is independently
    /// alive with probability 1/2, drawn from a deterministic expansion
    /// of `seed` (SHA-256 in counter mode, one bit per cell).
    pub fn randomized(row_count: usize, col_count: usize, seed: &[u8; 32]) -> Self {
        let mut bits = SeedBits::new(seed);
        Self::build(row_count, col_count, |_| bits.next_bit())
    }

    fn build(row_count: usize, col_count: usize, mut alive: impl FnMut(usize) -> bool) -> Self {
        let total = row_count.saturating_mul(col_count);
        let mut cells = Vec::with_capacity(total);
        let mut by_id = HashMap::with_capacity(total);
        let mut rows = Vec::with_capacity(row_count);

        for _ in 0..row_count {
            let mut row = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                let slot = cells.len();
                let id = CellId(slot as u64);
                cells.push(Cell {
                    id,
                    alive: alive(slot),
                });
                by_id.insert(id, slot);
                row.push(slot);
            }
            rows.push(row);
        }

        Grid { rows, cells, by_id }
    }

    /// Rebuild a grid from explicit per-cell (id, alive) pairs. Rows may
    /// have different lengths. Used to restore a snapshot and to set up
    /// irregular shapes in tests; ids must be unique.
    pub fn from_cells(layout: Vec<Vec<(CellId, bool)>>) -> Self {
        let total: usize = layout.iter().map(|r| r.len()).sum();
        let mut cells = Vec::with_capacity(total);
        let mut by_id = HashMap::with_capacity(total);
        let mut rows = Vec::with_capacity(layout.len());

        for layout_row in layout {
            let mut row = Vec::with_capacity(layout_row.len());
            for (id, alive) in layout_row {
                let slot = cells.len();
                cells.push(Cell { id, alive });
                by_id.insert(id, slot);
                row.push(slot);
            }
            rows.push(row);
        }

        Grid { rows, cells, by_id }
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of row `r`, or 0 if `r` is out of range.
    #[inline]
    pub fn row_len(&self, r: usize) -> usize {
        self.rows.get(r).map_or(0, |row| row.len())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn id_at(&self, r: usize, c: usize) -> Option<CellId> {
        let slot = *self.rows.get(r)?.get(c)?;
        Some(self.cells[slot].id)
    }

    pub fn alive_at(&self, r: usize, c: usize) -> Option<bool> {
        let slot = *self.rows.get(r)?.get(c)?;
        Some(self.cells[slot].alive)
    }

    pub fn is_alive(&self, id: CellId) -> Option<bool> {
        self.by_id.get(&id).map(|&slot| self.cells[slot].alive)
    }

    pub fn alive_count(&self) -> u32 {
        self.cells.iter().filter(|c| c.alive).count() as u32
    }

    /// Set a single cell's state by id. Returns false if the id is unknown.
    pub fn set_alive(&mut self, id: CellId, alive: bool) -> bool {
        match self.by_id.get(&id) {
            Some(&slot) => {
                self.cells[slot].alive = alive;
                true
            }
            None => false,
        }
    }

    /// Apply a diff list produced by [`Grid::step`]. Diffs with unknown
    /// ids are ignored.
    pub fn apply(&mut self, diffs: &[CellDiff]) {
        for diff in diffs {
            self.set_alive(diff.id, diff.alive);
        }
    }

    /// Iterate all cells row by row as (row, col, id, alive).
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, CellId, bool)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().map(move |(c, &slot)| {
                let cell = &self.cells[slot];
                (r, c, cell.id, cell.alive)
            })
        })
    }

    /// Count live neighbors of (r, c) among the 8 surrounding positions.
    /// Positions outside the grid, or past the end of their row, count 0.
    fn live_neighbors(&self, r: usize, c: usize) -> u8 {
        let mut count = 0u8;
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let nr = r as i64 + dr;
                let nc = c as i64 + dc;
                if nr < 0 || nc < 0 {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                let Some(row) = self.rows.get(nr) else {
                    continue;
                };
                let Some(&slot) = row.get(nc) else {
                    continue;
                };
                if self.cells[slot].alive {
                    count += 1;
                }
            }
        }
        count
    }

    /// Compute one generation and return the changed cells.
    ///
    /// Conway's rule, no alternative interpretations: an alive cell
    /// survives iff it has 2 or 3 live neighbors; a dead cell is born iff
    /// it has exactly 3. Every neighbor count reads the pre-step grid, so
    /// the whole generation is computed simultaneously - the grid itself
    /// is not touched, the caller applies the returned diffs.
    ///
    /// A grid with no rows (or only zero-length rows) yields an empty
    /// diff list.
    pub fn step(&self) -> Vec<CellDiff> {
        let mut diffs = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, &slot) in row.iter().enumerate() {
                let neighbors = self.live_neighbors(r, c);
                let cell = &self.cells[slot];
                let next = if cell.alive {
                    neighbors == 2 || neighbors == 3
                } else {
                    neighbors == 3
                };
                if next != cell.alive {
                    diffs.push(CellDiff {
                        id: cell.id,
                        alive: next,
                    });
                }
            }
        }
        diffs
    }
}

/// Deterministic bit stream over SHA-256(seed || counter) blocks.
/// Each block supplies 256 fair bits; the counter advances per block.
struct SeedBits {
    seed: [u8; 32],
    block: [u8; 32],
    counter: u64,
    used: usize,
}

impl SeedBits {
    fn new(seed: &[u8; 32]) -> Self {
        let mut s = SeedBits {
            seed: *seed,
            block: [0u8; 32],
            counter: 0,
            used: 0,
        };
        s.refill();
        s
    }

    fn refill(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(self.counter.to_be_bytes());
        self.block.copy_from_slice(&hasher.finalize());
        self.counter += 1;
        self.used = 0;
    }

    fn next_bit(&mut self) -> bool {
        if self.used == 256 {
            self.refill();
        }
        let byte = self.block[self.used / 8];
        let bit = byte >> (self.used % 8) & 1;
        self.used += 1;
        bit == 1
    }
}
