//! Life: On-Chain Game of Life Engine
//!
//! A diff-based Game of Life canister. The pure engine computes each
//! generation against the pre-step grid and reports only the cells that
//! changed; this layer owns the grid instance, applies the diffs, drives
//! the simulation from a once-per-second timer through an explicit
//! scheduler, and exposes the Candid API the frontend renders from.

pub mod engine;
pub mod scheduler;
pub mod types;

use candid::{CandidType, Deserialize};
use ic_cdk::management_canister::raw_rand;
use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
use std::cell::RefCell;
use std::time::Duration;

use crate::engine::{CellDiff, CellId, Grid};
use crate::scheduler::Scheduler;
use crate::types::{
    CellDiffView, CellView, GridState, DEFAULT_COLS, DEFAULT_ROWS, GENS_PER_SEC, MAX_GRID_DIM,
    TICK_INTERVAL_MS,
};

// =============================================================================
// STATE
// =============================================================================

thread_local! {
    /// The single grid instance. Replaced wholesale by randomize/clear,
    /// mutated in place by diff application - never both at once.
    static GRID: RefCell<Grid> = RefCell::new(Grid::cleared(DEFAULT_ROWS, DEFAULT_COLS));

    /// Simulation clock state: running flag, checkpoint, generation counter.
    static SCHEDULER: RefCell<Scheduler> = RefCell::new(Scheduler::new(GENS_PER_SEC, 0));
}

// =============================================================================
// HELPERS
// =============================================================================

fn validate_shape(rows: u32, cols: u32) -> Result<(usize, usize), String> {
    let (rows, cols) = (rows as usize, cols as usize);
    if rows == 0 || cols == 0 {
        return Err("Grid must have at least one row and one column".to_string());
    }
    if rows > MAX_GRID_DIM || cols > MAX_GRID_DIM {
        return Err(format!("Grid dimensions capped at {}", MAX_GRID_DIM));
    }
    Ok((rows, cols))
}

/// Guard against degenerate randomness (all zeros or all ones), which
/// would indicate a failure in the management canister's VRF.
fn validate_randomness(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < 32 {
        return Err("Insufficient randomness bytes".to_string());
    }
    let first_8 = &bytes[0..8];
    if first_8.iter().all(|&b| b == 0) {
        return Err("Degenerate randomness detected: all zeros".to_string());
    }
    if first_8.iter().all(|&b| b == 0xFF) {
        return Err("Degenerate randomness detected: all ones".to_string());
    }
    Ok(())
}

/// Run every generation the scheduler owes at `now_ns`. Each generation is
/// computed from the pre-step grid and applied as a diff list.
fn catch_up(now_ns: u64) -> u64 {
    let gens = SCHEDULER.with(|s| s.borrow_mut().due(now_ns));
    if gens > 0 {
        GRID.with(|g| {
            let grid = &mut *g.borrow_mut();
            for _ in 0..gens {
                let diffs = grid.step();
                grid.apply(&diffs);
            }
        });
        SCHEDULER.with(|s| s.borrow_mut().bump(gens));
    }
    gens
}

fn replace_grid(grid: Grid) -> GridState {
    GRID.with(|g| *g.borrow_mut() = grid);
    SCHEDULER.with(|s| s.borrow_mut().touch(ic_cdk::api::time()));
    build_state()
}

fn build_state() -> GridState {
    let rows = GRID.with(|g| {
        let grid = g.borrow();
        (0..grid.row_count())
            .map(|r| {
                (0..grid.row_len(r))
                    .map(|c| CellView {
                        id: grid.id_at(r, c).map_or(0, CellId::as_raw),
                        alive: grid.alive_at(r, c).unwrap_or(false),
                    })
                    .collect()
            })
            .collect()
    });

    SCHEDULER.with(|s| {
        let s = s.borrow();
        GridState {
            rows,
            generation: s.generation(),
            is_running: s.is_running(),
            checkpoint_timestamp_ns: s.checkpoint_ns(),
        }
    })
}

fn diff_views(diffs: &[CellDiff]) -> Vec<CellDiffView> {
    diffs
        .iter()
        .map(|d| CellDiffView {
            id: d.id.as_raw(),
            alive: d.alive,
        })
        .collect()
}

// =============================================================================
// TIMER
// =============================================================================

fn start_simulation_timer() {
    // IC CDK timers expect an async function that returns a Future.
    // The async block runs synchronously (no .await points), so it
    // executes immediately.
    ic_cdk_timers::set_timer_interval(Duration::from_millis(TICK_INTERVAL_MS), || async {
        catch_up(ic_cdk::api::time());
    });
}

// =============================================================================
// UPGRADE SNAPSHOT
// =============================================================================

#[derive(CandidType, Deserialize)]
struct Snapshot {
    rows: Vec<Vec<CellView>>,
    generation: u64,
    is_running: bool,
    checkpoint_timestamp_ns: u64,
}

// =============================================================================
// CANISTER LIFECYCLE
// =============================================================================

#[init]
fn init() {
    let now = ic_cdk::api::time();
    SCHEDULER.with(|s| *s.borrow_mut() = Scheduler::new(GENS_PER_SEC, now));
    start_simulation_timer();
    ic_cdk::println!(
        "Life Backend Initialized - {}x{} grid, {} gen/sec",
        DEFAULT_ROWS,
        DEFAULT_COLS,
        GENS_PER_SEC
    );
}

#[pre_upgrade]
fn pre_upgrade() {
    let state = build_state();
    let snapshot = Snapshot {
        rows: state.rows,
        generation: state.generation,
        is_running: state.is_running,
        checkpoint_timestamp_ns: state.checkpoint_timestamp_ns,
    };
    let encoded = candid::encode_one(&snapshot).unwrap();

    let pages_needed = (encoded.len() as u64 + 4) / 65536 + 1;
    ic_cdk::stable::stable_grow(pages_needed).ok();
    ic_cdk::stable::stable_write(0, &(encoded.len() as u32).to_le_bytes());
    ic_cdk::stable::stable_write(4, &encoded);
}

#[post_upgrade]
fn post_upgrade() {
    let now = ic_cdk::api::time();
    let mut restored = false;

    if ic_cdk::stable::stable_size() > 0 {
        let mut len_buf = [0u8; 4];
        ic_cdk::stable::stable_read(0, &mut len_buf);
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > 0 && len < 10_000_000 {
            let mut buf = vec![0u8; len];
            ic_cdk::stable::stable_read(4, &mut buf);

            if let Ok(snapshot) = candid::decode_one::<Snapshot>(&buf) {
                let layout = snapshot
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|cell| (CellId::from_raw(cell.id), cell.alive))
                            .collect()
                    })
                    .collect();
                GRID.with(|g| *g.borrow_mut() = Grid::from_cells(layout));
                SCHEDULER.with(|s| {
                    *s.borrow_mut() = Scheduler::restore(
                        GENS_PER_SEC,
                        now,
                        snapshot.generation,
                        snapshot.is_running,
                    )
                });
                restored = true;
            }
        }
    }

    if !restored {
        // First deploy or incompatible snapshot: fresh default grid
        GRID.with(|g| *g.borrow_mut() = Grid::cleared(DEFAULT_ROWS, DEFAULT_COLS));
        SCHEDULER.with(|s| *s.borrow_mut() = Scheduler::new(GENS_PER_SEC, now));
        ic_cdk::println!("Life Backend post_upgrade: no usable snapshot, initialized fresh grid");
    }

    start_simulation_timer();
}

// =============================================================================
// UPDATE METHODS
// =============================================================================

/// Run exactly one generation and return the changed cells. The caller
/// already holds the rest of the grid, so the diff list is all it needs
/// to update its view.
#[update]
fn step_once() -> Vec<CellDiffView> {
    let now = ic_cdk::api::time();
    let diffs = GRID.with(|g| {
        let grid = &mut *g.borrow_mut();
        let diffs = grid.step();
        grid.apply(&diffs);
        diffs
    });
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        s.bump(1);
        // Manual step counts against the clock - don't replay the interval
        s.touch(now);
    });
    diff_views(&diffs)
}

/// Catch the simulation up to the current time and return the new
/// generation number.
#[update]
fn manual_tick() -> u64 {
    catch_up(ic_cdk::api::time());
    SCHEDULER.with(|s| s.borrow().generation())
}

/// Replace the grid with a fresh one where each cell is alive with
/// probability 1/2, seeded from the management canister's VRF.
#[update]
async fn randomize_grid(rows: u32, cols: u32) -> Result<GridState, String> {
    let (rows, cols) = validate_shape(rows, cols)?;

    let random_bytes = raw_rand()
        .await
        .map_err(|e| format!("Randomness unavailable: {:?}", e))?;
    validate_randomness(&random_bytes)?;

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&random_bytes[0..32]);

    Ok(replace_grid(Grid::randomized(rows, cols, &seed)))
}

/// Replace the grid with an all-dead one of the given shape.
#[update]
fn clear_grid(rows: u32, cols: u32) -> Result<GridState, String> {
    let (rows, cols) = validate_shape(rows, cols)?;
    Ok(replace_grid(Grid::cleared(rows, cols)))
}

/// Set a single cell's state (frontend click/toggle path).
#[update]
fn set_cell(id: u64, alive: bool) -> Result<(), String> {
    GRID.with(|g| {
        if g.borrow_mut().set_alive(CellId::from_raw(id), alive) {
            Ok(())
        } else {
            Err(format!("Unknown cell id {}", id))
        }
    })
}

/// Pause the simulation. Generations do not accrue while paused.
#[update]
fn pause() {
    SCHEDULER.with(|s| s.borrow_mut().stop());
}

/// Resume the simulation from the current time.
#[update]
fn resume() {
    let now = ic_cdk::api::time();
    SCHEDULER.with(|s| s.borrow_mut().start(now));
}

// =============================================================================
// QUERY METHODS
// =============================================================================

/// Full grid state, cells in row order.
#[query]
fn get_state() -> GridState {
    build_state()
}

#[query]
fn get_generation() -> u64 {
    SCHEDULER.with(|s| s.borrow().generation())
}

#[query]
fn get_alive_count() -> u32 {
    GRID.with(|g| g.borrow().alive_count())
}

#[query]
fn is_running() -> bool {
    SCHEDULER.with(|s| s.borrow().is_running())
}

/// Simple greeting
#[query]
fn greet(name: String) -> String {
    format!(
        "Hello, {}! Welcome to the {}x{} Game of Life world.",
        name, DEFAULT_ROWS, DEFAULT_COLS
    )
}

// =============================================================================
// TESTS
// =============================================================================


// Export Candid interface
ic_cdk::export_candid!();
