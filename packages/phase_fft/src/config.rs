use std::num::NonZero;
use std::thread;

use new_zealand::nz;
use phase_barrier::Backoff;

/// Direction of a transform.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a transform only ever goes forward or back"
)]
pub enum Direction {
    /// Time domain to frequency domain, twiddle factors `exp(-2πi k / n)`.
    #[default]
    Forward,

    /// Frequency domain to time domain, twiddle factors `exp(+2πi k / n)`, with the result
    /// scaled by `1 / n` so that a forward transform followed by an inverse transform
    /// reproduces the input.
    Inverse,
}

impl Direction {
    /// Sign of the twiddle factor exponent.
    pub(crate) fn sign(self) -> f64 {
        match self {
            Self::Forward => -1.0,
            Self::Inverse => 1.0,
        }
    }
}

/// How [`parallel_fft()`][crate::parallel_fft] distributes and synchronizes its work.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use phase_barrier::Backoff;
/// use phase_fft::{Direction, FftConfig};
///
/// let config = FftConfig::new()
///     .with_workers(nz!(8))
///     .with_direction(Direction::Inverse)
///     .with_backoff(Backoff::new(nz!(32), nz!(8192)))
///     .with_pinned_workers(true);
///
/// assert_eq!(config.workers().get(), 8);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FftConfig {
    workers: NonZero<usize>,
    backoff: Backoff,
    direction: Direction,
    pin_workers: bool,
}

impl FftConfig {
    /// One worker per processor available to the current process, a forward transform and the
    /// default barrier backoff, with workers not pinned to processors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(nz!(1)),
            backoff: Backoff::default(),
            direction: Direction::Forward,
            pin_workers: false,
        }
    }

    /// Sets the number of workers.
    ///
    /// The transform never uses more workers than there are butterfly pairs (half the buffer
    /// length), so this is an upper bound.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZero<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the spin policy of the barrier between stages.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the direction of the transform.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Whether each worker thread is pinned to its own processor.
    ///
    /// Pinning is best-effort: workers beyond the number of processors the operating system
    /// reports, or workers that fail to pin, run unpinned.
    #[must_use]
    pub fn with_pinned_workers(mut self, pin_workers: bool) -> Self {
        self.pin_workers = pin_workers;
        self
    }

    /// Upper bound on the number of workers.
    #[must_use]
    pub fn workers(&self) -> NonZero<usize> {
        self.workers
    }

    /// Spin policy of the barrier between stages.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Direction of the transform.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether worker threads are pinned to processors.
    #[must_use]
    pub fn pins_workers(&self) -> bool {
        self.pin_workers
    }
}

impl Default for FftConfig {
    fn default() -> Self {
        Self::new()
    }
}
