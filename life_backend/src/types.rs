use candid::{CandidType, Deserialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default grid shape built by `init`.
pub const DEFAULT_ROWS: usize = 16;
pub const DEFAULT_COLS: usize = 16;

/// Largest accepted dimension for `randomize_grid`/`clear_grid`. Keeps a
/// full-grid step well inside the per-message instruction limit.
pub const MAX_GRID_DIM: usize = 256;

/// Simulation rate and timer cadence: 10 generations per second, ticked
/// once per second.
pub const GENS_PER_SEC: u64 = 10;
pub const TICK_INTERVAL_MS: u64 = 1000;

// =============================================================================
// CANDID TYPES
// =============================================================================

/// One cell as the frontend sees it: stable id plus current state.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellView {
    pub id: u64,
    pub alive: bool,
}

/// One changed cell from a step: stable id plus its new state. Cells whose
/// state did not change are never included.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellDiffView {
    pub id: u64,
    pub alive: bool,
}

/// Full state returned to the frontend: cells in row order plus the
/// bookkeeping needed to stay in sync with the simulation clock.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct GridState {
    pub rows: Vec<Vec<CellView>>,
    pub generation: u64,
    pub is_running: bool,
    pub checkpoint_timestamp_ns: u64,
}
