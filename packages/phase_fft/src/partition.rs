use std::num::NonZero;
use std::ops::Range;

/// Splits `0..total` into `workers` contiguous blocks and returns the block of worker `index`.
///
/// Blocks differ in size by at most one item. The first `total % workers` workers get the
/// larger blocks.
///
/// # Panics
///
/// Panics if `index` is not less than `workers`.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use phase_fft::partition;
///
/// assert_eq!(partition(10, nz!(3), 0), 0..4);
/// assert_eq!(partition(10, nz!(3), 1), 4..7);
/// assert_eq!(partition(10, nz!(3), 2), 7..10);
/// ```
#[must_use]
#[expect(
    clippy::arithmetic_side_effects,
    reason = "block bounds never exceed total, so they cannot overflow"
)]
#[expect(
    clippy::integer_division,
    reason = "the remainder is distributed over the first blocks"
)]
pub fn partition(total: usize, workers: NonZero<usize>, index: usize) -> Range<usize> {
    assert!(
        index < workers.get(),
        "worker index {index} out of bounds for {workers} workers"
    );

    let chunk = total / workers.get();
    let remainder = total % workers.get();

    let start = index * chunk + index.min(remainder);
    let end = start + chunk + usize::from(index < remainder);

    start..end
}
