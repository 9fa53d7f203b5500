use std::hint;
use std::num::NonZero;
use std::thread;

use new_zealand::nz;

/// Spin policy applied by workers that reach a [`PhaseBarrier`][crate::PhaseBarrier] before
/// the phase is released.
///
/// Between two polls of the shared phase counter, a waiting worker spins locally for a budget of
/// iterations that starts at [`initial_spins()`][Self::initial_spins] and doubles after every
/// poll, saturating at [`max_spins()`][Self::max_spins]. Local spinning does not touch shared
/// memory, which keeps the interconnect quiet while the last workers are still computing.
///
/// A higher cap lowers interconnect pressure but increases the worst-case wake-up latency.
/// The defaults come from tuning against small FFT stages on a 4-core system and are a starting
/// point, not a universally good choice.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use phase_barrier::{Backoff, PhaseBarrier};
///
/// let backoff = Backoff::new(nz!(16), nz!(4096)).yield_when_saturated(true);
/// let barrier = PhaseBarrier::with_backoff(nz!(2), backoff);
///
/// assert_eq!(barrier.backoff().max_spins().get(), 4096);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Backoff {
    initial_spins: NonZero<u32>,
    max_spins: NonZero<u32>,
    yield_when_saturated: bool,
}

impl Backoff {
    /// Spin budget of the first back-off round if not otherwise configured.
    pub const DEFAULT_INITIAL_SPINS: NonZero<u32> = nz!(100);

    /// Upper bound of the per-round spin budget if not otherwise configured.
    pub const DEFAULT_MAX_SPINS: NonZero<u32> = nz!(100_000);

    /// Creates a policy with the given initial and maximum per-round spin budgets.
    ///
    /// If `max_spins` is less than `initial_spins`, it is raised to `initial_spins`, meaning
    /// every round spins for exactly `initial_spins` iterations.
    #[must_use]
    pub const fn new(initial_spins: NonZero<u32>, max_spins: NonZero<u32>) -> Self {
        let max_spins = if max_spins.get() < initial_spins.get() {
            initial_spins
        } else {
            max_spins
        };

        Self {
            initial_spins,
            max_spins,
            yield_when_saturated: false,
        }
    }

    /// Whether a waiter should also yield its time slice to the operating system after every
    /// round that spins for the full [`max_spins()`][Self::max_spins] budget.
    ///
    /// This is off by default. Turn it on when the group may have more participants than there
    /// are processors available, where pure spinning can starve the very worker that everyone
    /// is waiting for.
    #[must_use]
    pub const fn yield_when_saturated(mut self, value: bool) -> Self {
        self.yield_when_saturated = value;
        self
    }

    /// Spin budget of the first back-off round.
    #[must_use]
    pub const fn initial_spins(&self) -> NonZero<u32> {
        self.initial_spins
    }

    /// Upper bound of the per-round spin budget.
    #[must_use]
    pub const fn max_spins(&self) -> NonZero<u32> {
        self.max_spins
    }

    /// Whether saturated rounds also yield to the operating system.
    #[must_use]
    pub const fn yields_when_saturated(&self) -> bool {
        self.yield_when_saturated
    }

    /// Spins locally for `budget` iterations. Performs no writes to shared memory.
    #[inline]
    pub(crate) fn spin(&self, budget: NonZero<u32>) {
        for _ in 0..budget.get() {
            hint::spin_loop();
        }

        if self.yield_when_saturated && budget >= self.max_spins {
            thread::yield_now();
        }
    }

    /// The budget of the round after a round that spent `budget`.
    #[inline]
    #[must_use]
    pub(crate) fn next_budget(&self, budget: NonZero<u32>) -> NonZero<u32> {
        budget.saturating_mul(nz!(2)).min(self.max_spins)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_SPINS, Self::DEFAULT_MAX_SPINS)
    }
}
