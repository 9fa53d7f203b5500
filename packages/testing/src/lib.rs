#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in phase barrier packages.

use std::num::NonZero;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// How long a test may run before [`with_watchdog`] declares it hung.
///
/// Barrier tests hang rather than fail when synchronization is broken, so every multithreaded
/// test needs an upper bound. Miri is dramatically slower for thread synchronization, so it gets
/// a longer bound to avoid false positives while still catching real hangs.
pub const WATCHDOG_TIMEOUT: Duration = if cfg!(miri) {
    Duration::from_secs(300)
} else {
    Duration::from_secs(30)
};

/// Runs a test with a timeout to prevent infinite hangs.
///
/// A deadlocked barrier spins forever instead of failing, which would stall CI. This wraps the
/// test so that exceeding [`WATCHDOG_TIMEOUT`] fails the test with a panic instead.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled and
/// the test function is executed directly. This allows mutation testing to detect hanging
/// mutations through its own timeout.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode) or if the test
/// itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    with_watchdog_timeout(WATCHDOG_TIMEOUT, test_fn)
}

/// Same as [`with_watchdog`] but with a caller-specified timeout, for long-running stress tests.
///
/// # Panics
///
/// Panics if the test exceeds `timeout` (when not in mutation testing mode) or if the test
/// itself panics.
pub fn with_watchdog_timeout<F, R>(timeout: Duration, test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already given up on us.
        drop(tx.send(result));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            // The test thread is most likely spinning in a barrier that will never release.
            // We cannot stop it, only stop waiting for it.
            panic!("test exceeded {timeout:?} timeout - is a barrier deadlocked?");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Runs `participant` on `count` scoped threads at the same time, passing each its index in
/// `0..count`, and returns the results ordered by index.
///
/// Borrowed state (such as a barrier under test) can be shared with the participants directly
/// because all of them are joined before this function returns.
///
/// # Panics
///
/// Panics if any participant panics.
#[expect(
    clippy::must_use_candidate,
    reason = "participants are often run only for their side effects"
)]
pub fn run_participants<F, R>(count: NonZero<usize>, participant: F) -> Vec<R>
where
    F: Fn(usize) -> R + Sync,
    R: Send,
{
    let participant = &participant;

    thread::scope(|s| {
        let handles = (0..count.get())
            .map(|index| {
                thread::Builder::new()
                    .name(format!("participant-{index}"))
                    .spawn_scoped(s, move || participant(index))
                    .expect("failed to spawn participant thread: thread spawning failure is not supported")
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("participant thread panicked"))
            .collect()
    })
}

/// Number of participants for stress tests: every processor available to the process, but at
/// least two so that there is always somebody to wait for.
#[must_use]
pub fn stress_participant_count() -> NonZero<usize> {
    let available = thread::available_parallelism().map_or(1, NonZero::get);

    NonZero::new(available.max(2)).expect("guarded by max(2) above")
}
