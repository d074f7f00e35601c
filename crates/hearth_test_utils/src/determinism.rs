//! Determinism testing utilities.
//!
//! Runs the same setup several times and compares state hashes, so a
//! change that lets iteration order or float math leak into the
//! simulation shows up as a failing test rather than a desync.
//!
//! The core guards against the usual suspects itself:
//!
//! - positions, timers and rates are [`hearth_core::math::Fixed`]
//! - systems visit entities in sorted ID order
//! - movement reads a neighbor snapshot taken before anyone moves

use std::thread;

use hearth_core::math::Fixed;
use hearth_core::simulation::Simulation;

/// Final hashes of several runs of one setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismReport {
    /// Final state hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each run simulated.
    pub ticks: u64,
}

impl DeterminismReport {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Distinct final hashes, sorted. One entry when deterministic.
    #[must_use]
    pub fn distinct_hashes(&self) -> Vec<u64> {
        let mut distinct = self.hashes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
    }

    /// # Panics
    ///
    /// Panics with every hash when the runs diverged.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "runs diverged after {} ticks: {} distinct hashes in {:?}",
            self.ticks,
            self.distinct_hashes().len(),
            self.hashes
        );
    }
}

/// Run any stepped state `runs` times and collect its final hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismReport
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            for _ in 0..ticks {
                step(&mut state);
            }
            hash(&state)
        })
        .collect();

    DeterminismReport { hashes, ticks }
}

/// Run a [`Simulation`] setup twice at a fixed `dt`.
pub fn verify_simulation_determinism<F>(setup: F, ticks: u64, dt: Fixed) -> DeterminismReport
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        ticks,
        setup,
        |sim| {
            sim.tick(dt);
        },
        Simulation::state_hash,
    )
}

/// Run `sims` copies of a setup on their own threads.
///
/// Catches state that depends on the thread or on allocation addresses.
pub fn run_parallel_simulations<F>(setup: F, sims: usize, ticks: u64, dt: Fixed) -> DeterminismReport
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..sims)
            .map(|_| {
                scope.spawn(|| {
                    let mut sim = setup();
                    for _ in 0..ticks {
                        sim.tick(dt);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    DeterminismReport { hashes, ticks }
}

/// Step two copies side by side and return the first tick they differ on.
///
/// Tick `0` means the setups already differ.
pub fn find_first_divergence<F>(setup: F, ticks: u64, dt: Fixed) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut left = setup();
    let mut right = setup();

    if left.state_hash() != right.state_hash() {
        return Some(0);
    }

    (1..=ticks).find(|_| {
        left.tick(dt);
        right.tick(dt);
        left.state_hash() != right.state_hash()
    })
}
