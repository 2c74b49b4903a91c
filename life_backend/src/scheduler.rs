//! Tick scheduler for the simulation.
//!
//! An explicit object instead of a free-running global timer: the clock is
//! injected as a nanosecond timestamp on every call, so the canister feeds
//! it `ic_cdk::api::time()` while tests feed it synthetic values. The
//! scheduler owns the generation counter and the catch-up arithmetic; it
//! never steps the grid itself.

/// Hard cap on generations owed by a single catch-up. Each generation
/// costs instructions against the per-message limit, so an arbitrarily
/// long gap between ticks must not turn into an arbitrarily long loop.
pub const MAX_CATCHUP_GENS: u64 = 200;

const NS_PER_SEC: u64 = 1_000_000_000;

#[derive(Clone, Debug)]
pub struct Scheduler {
    running: bool,
    checkpoint_ns: u64,
    gens_per_sec: u64,
    generation: u64,
}

impl Scheduler {
    /// New running scheduler checkpointed at `now_ns`, owing nothing.
    pub fn new(gens_per_sec: u64, now_ns: u64) -> Self {
        Scheduler {
            running: true,
            checkpoint_ns: now_ns,
            gens_per_sec: gens_per_sec.max(1),
            generation: 0,
        }
    }

    /// Restore from a snapshot (upgrade path).
    pub fn restore(gens_per_sec: u64, now_ns: u64, generation: u64, running: bool) -> Self {
        let mut s = Self::new(gens_per_sec, now_ns);
        s.generation = generation;
        s.running = running;
        s
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn checkpoint_ns(&self) -> u64 {
        self.checkpoint_ns
    }

    /// Resume. The checkpoint moves to `now_ns` so time spent paused is
    /// not back-paid as a burst of generations.
    pub fn start(&mut self, now_ns: u64) {
        if !self.running {
            self.running = true;
            self.checkpoint_ns = now_ns;
        }
    }

    /// Pause. Generations accrued but not yet consumed are dropped.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Reset the checkpoint without consuming generations. Called when the
    /// grid is replaced or stepped manually, so the timer does not replay
    /// the interval that led up to that action.
    pub fn touch(&mut self, now_ns: u64) {
        self.checkpoint_ns = now_ns;
    }

    /// Record `n` completed generations.
    pub fn bump(&mut self, n: u64) {
        self.generation += n;
    }

    /// How many whole generations are owed at `now_ns`, capped at
    /// [`MAX_CATCHUP_GENS`]. Consumes what it returns: the checkpoint
    /// advances by the returned generations' worth of time (keeping the
    /// sub-generation remainder), except that a capped catch-up forfeits
    /// the backlog and re-checkpoints at `now_ns`.
    pub fn due(&mut self, now_ns: u64) -> u64 {
        if !self.running {
            return 0;
        }
        let elapsed_ns = now_ns.saturating_sub(self.checkpoint_ns);
        let owed = elapsed_ns / NS_PER_SEC * self.gens_per_sec
            + elapsed_ns % NS_PER_SEC * self.gens_per_sec / NS_PER_SEC;
        if owed > MAX_CATCHUP_GENS {
            self.checkpoint_ns = now_ns;
            MAX_CATCHUP_GENS
        } else {
            self.checkpoint_ns += owed * NS_PER_SEC / self.gens_per_sec;
            owed
        }
    }
}
