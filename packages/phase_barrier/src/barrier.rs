use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{self, AtomicU64, AtomicUsize, Ordering};

use tracing::trace;

use crate::{Backoff, CachePadded};

/// Blocks a fixed group of `threshold` workers until every one of them has called
/// [`wait()`][Self::wait] for the current phase, then releases them all together.
///
/// The barrier is reusable: once a phase is released, the same barrier serves the next phase
/// without any reset by the caller. Phases are numbered by a generation counter, so a slow
/// waiter from phase `p` can never be confused with an early arrival for phase `p + 1`.
///
/// # Memory ordering
///
/// Every write a worker performs before its `p`-th call to `wait()` is visible to every other
/// worker after that worker's `p`-th call to `wait()` returns. Operations of different workers
/// within the same phase are not ordered relative to each other.
///
/// # Caller contract
///
/// Exactly `threshold` calls to `wait()` must be made per phase. Too few calls means the callers
/// spin forever; too many means surplus callers count towards the next phase. Neither condition
/// is reported as an error. Debug builds assert that no more than `threshold` arrivals are ever
/// counted in one phase.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use new_zealand::nz;
/// use phase_barrier::PhaseBarrier;
///
/// let barrier = PhaseBarrier::new(nz!(2));
/// let mut stage_one = [0_u32; 2];
///
/// thread::scope(|s| {
///     let (left, right) = stage_one.split_at_mut(1);
///     let barrier = &barrier;
///
///     s.spawn(move || {
///         left[0] = 1;
///         barrier.wait();
///     });
///     s.spawn(move || {
///         right[0] = 2;
///         barrier.wait();
///     });
/// });
///
/// assert_eq!(stage_one, [1, 2]);
/// assert_eq!(barrier.phase(), 1);
/// ```
pub struct PhaseBarrier {
    // The two counters mutated during a phase live on separate cache lines: arrivals write to
    // `arrived` while waiters poll `phase`, and neither must invalidate the other.
    arrived: CachePadded<AtomicUsize>,
    phase: CachePadded<AtomicU64>,

    threshold: NonZero<usize>,
    backoff: Backoff,
}

impl PhaseBarrier {
    /// Creates a barrier for `threshold` participants with the default [`Backoff`] policy.
    ///
    /// A barrier with a threshold of 1 is valid; its [`wait()`][Self::wait] returns immediately.
    #[must_use]
    pub fn new(threshold: NonZero<usize>) -> Self {
        Self::with_backoff(threshold, Backoff::default())
    }

    /// Creates a barrier for `threshold` participants that waits according to `backoff`.
    #[must_use]
    pub fn with_backoff(threshold: NonZero<usize>, backoff: Backoff) -> Self {
        trace!(
            threshold = threshold.get(),
            initial_spins = backoff.initial_spins().get(),
            max_spins = backoff.max_spins().get(),
            "phase barrier created"
        );

        Self {
            arrived: CachePadded::new(AtomicUsize::new(0)),
            phase: CachePadded::new(AtomicU64::new(0)),
            threshold,
            backoff,
        }
    }

    /// Number of participants that must call [`wait()`][Self::wait] to release a phase.
    #[must_use]
    pub fn threshold(&self) -> NonZero<usize> {
        self.threshold
    }

    /// The spin policy used by participants waiting for a release.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Number of phases released so far.
    ///
    /// Always 0 for a barrier with a threshold of 1, as such a barrier never needs to release
    /// anyone. The value is only a snapshot; it may advance at any time while participants are
    /// active.
    #[must_use]
    pub fn phase(&self) -> u64 {
        self.phase.load(Ordering::Acquire)
    }

    /// Blocks until `threshold` participants (including the caller) have called `wait()` for
    /// the current phase.
    ///
    /// The participant whose arrival completes the phase releases everyone else and returns
    /// without waiting. The others spin until they observe the release. There is no timeout and
    /// no cancellation.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if more than `threshold` arrivals are counted in one phase, which
    /// indicates that the caller contract was violated.
    #[inline]
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "threshold is at least 2 past the early return"
    )]
    pub fn wait(&self) {
        let threshold = self.threshold.get();

        if threshold == 1 {
            return;
        }

        // Must be read before we announce our arrival. Once we have arrived, the phase may be
        // released at any moment and we would not be able to tell our phase from the next one.
        let observed_phase = self.phase.load(Ordering::Acquire);

        // AcqRel forms a release sequence through all arrivals of this phase, so the releaser
        // acquires every write that the other participants made before arriving.
        let previously_arrived = self.arrived.fetch_add(1, Ordering::AcqRel);

        debug_assert!(
            previously_arrived < threshold,
            "{previously_arrived} participants had already arrived at a barrier with threshold {threshold} - more participants are calling wait() than the barrier was created for"
        );

        if previously_arrived == threshold - 1 {
            // Nobody else touches `arrived` until they observe the new phase, and the release
            // below publishes this reset together with the phase change.
            self.arrived.store(0, Ordering::Relaxed);
            self.phase.fetch_add(1, Ordering::Release);
        } else {
            self.wait_for_release(observed_phase);
        }
    }

    #[cfg_attr(test, mutants::skip)] // Mutating the exit condition just hangs the tests.
    fn wait_for_release(&self, observed_phase: u64) {
        let mut budget = self.backoff.initial_spins();

        while self.phase.load(Ordering::Relaxed) == observed_phase {
            self.backoff.spin(budget);
            budget = self.backoff.next_budget(budget);
        }

        // Pairs with the Release increment of the phase by the releaser.
        atomic::fence(Ordering::Acquire);
    }
}

impl fmt::Debug for PhaseBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("arrived", &self.arrived.load(Ordering::Relaxed))
            .field("phase", &self.phase.load(Ordering::Relaxed))
            .field("threshold", &self.threshold)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::mem::offset_of;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::{Duration, Instant};

    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing::with_watchdog;

    use super::*;
    use crate::CACHE_LINE_SIZE;

    assert_impl_all!(PhaseBarrier: Send, Sync);

    #[test]
    fn counters_do_not_share_cache_line() {
        let arrived = offset_of!(PhaseBarrier, arrived);
        let phase = offset_of!(PhaseBarrier, phase);

        assert!(arrived.abs_diff(phase) >= CACHE_LINE_SIZE);
    }

    #[test]
    fn single_participant_never_blocks() {
        let barrier = PhaseBarrier::new(nz!(1));

        let started = Instant::now();

        for _ in 0..10_000 {
            barrier.wait();
        }

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(barrier.phase(), 0);
    }

    #[test]
    fn releaser_resets_arrivals() {
        with_watchdog(|| {
            let barrier = PhaseBarrier::new(nz!(2));

            thread::scope(|s| {
                s.spawn(|| barrier.wait());
                barrier.wait();
            });

            assert_eq!(barrier.phase(), 1);
            assert_eq!(barrier.arrived.load(Ordering::Relaxed), 0);
        });
    }

    #[cfg_attr(miri, ignore = "spins for a noticeable duration, too slow under Miri")]
    #[test]
    fn waiter_does_not_pass_until_last_arrival() {
        with_watchdog(|| {
            let barrier = PhaseBarrier::new(nz!(2));
            let passed = AtomicBool::new(false);

            thread::scope(|s| {
                s.spawn(|| {
                    barrier.wait();
                    passed.store(true, Ordering::Release);
                });

                thread::sleep(Duration::from_millis(50));
                assert!(!passed.load(Ordering::Acquire));
                assert_eq!(barrier.phase(), 0);

                barrier.wait();
            });

            assert!(passed.load(Ordering::Acquire));
        });
    }

    #[test]
    fn custom_backoff_is_kept() {
        let backoff = Backoff::new(nz!(3), nz!(9));
        let barrier = PhaseBarrier::with_backoff(nz!(4), backoff);

        assert_eq!(barrier.backoff(), backoff);
        assert_eq!(barrier.threshold().get(), 4);
    }

    #[test]
    fn debug_output_names_fields() {
        let barrier = PhaseBarrier::new(nz!(3));
        let output = format!("{barrier:?}");

        assert!(output.contains("PhaseBarrier"));
        assert!(output.contains("threshold"));
        assert!(output.contains("phase"));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn surplus_arrival_detected_in_debug_builds() {
        let barrier = PhaseBarrier::new(nz!(2));

        // Simulate a phase that was already full when another participant shows up.
        barrier.arrived.store(2, Ordering::Relaxed);
        barrier.wait();
    }
}
