use std::f64::consts::TAU;
use std::num::NonZero;
use std::ops::Range;
use std::thread;

use core_affinity::CoreId;
use num_complex::Complex64;
use phase_barrier::PhaseBarrier;
use tracing::{debug, trace};

use crate::{Direction, Error, FftConfig, Result, SharedBuffer, partition, run_workers};

/// Reorders `data` in place so that the element at index `i` moves to the index whose binary
/// representation is `i` with its bits reversed.
///
/// This is the input permutation of an in-place iterative radix-2 FFT.
///
/// # Panics
///
/// Panics if the length of `data` is neither a power of two nor less than 2.
#[expect(
    clippy::arithmetic_side_effects,
    reason = "a power of two length has at most usize::BITS - 1 trailing zeros"
)]
pub fn bit_reverse_permute(data: &mut [Complex64]) {
    let len = data.len();

    if len < 2 {
        return;
    }

    assert!(
        len.is_power_of_two(),
        "bit reversal requires a power of two length, got {len}"
    );

    let shift = usize::BITS - len.trailing_zeros();

    for index in 0..len {
        let reversed = index.reverse_bits() >> shift;

        if index < reversed {
            data.swap(index, reversed);
        }
    }
}

/// Transforms `data` in place on the current thread.
///
/// This is the reference that parallel results are validated against. Twiddle factors are
/// produced by a running product, as opposed to the direct evaluation in the parallel transform,
/// so the two do not share rounding behavior.
///
/// # Errors
///
/// Returns an error if the length of `data` is not a power of two of at least 2.
#[expect(
    clippy::arithmetic_side_effects,
    reason = "complex arithmetic and stage lengths bounded by the buffer length"
)]
#[expect(clippy::integer_division, reason = "stage lengths are powers of two")]
pub fn serial_fft(data: &mut [Complex64], direction: Direction) -> Result<()> {
    check_length(data.len())?;

    bit_reverse_permute(data);

    let mut stage_len = 2;

    while stage_len <= data.len() {
        let step = Complex64::from_polar(1.0, direction.sign() * TAU / as_f64(stage_len));

        for group in data.chunks_exact_mut(stage_len) {
            let (tops, bottoms) = group.split_at_mut(stage_len / 2);
            let mut twiddle = Complex64::new(1.0, 0.0);

            for (top, bottom) in tops.iter_mut().zip(bottoms.iter_mut()) {
                let a = *top;
                let b = twiddle * *bottom;

                *top = a + b;
                *bottom = a - b;

                twiddle *= step;
            }
        }

        stage_len <<= 1;
    }

    if direction == Direction::Inverse {
        scale_by_len(data);
    }

    Ok(())
}

/// Transforms `data` in place, splitting every butterfly stage across a group of worker threads
/// that meet at a [`PhaseBarrier`] between stages.
///
/// The buffer holds `len / 2` butterfly pairs per stage. Each worker owns a fixed contiguous
/// block of pair indices for the whole transform (see [`partition()`]); which elements those
/// pairs touch changes from stage to stage. The number of workers is the configured count,
/// limited to the number of pairs. With a single worker the transform runs on the calling thread.
///
/// # Errors
///
/// Returns an error if the length of `data` is not a power of two of at least 2.
///
/// # Panics
///
/// Panics if a worker thread cannot be spawned. No worker touches `data` unless all of them
/// have been spawned, so the panic is raised promptly and `data` is left bit-reversed but
/// otherwise untransformed.
pub fn parallel_fft(data: &mut [Complex64], config: &FftConfig) -> Result<()> {
    check_length(data.len())?;

    let len = data.len();

    #[expect(clippy::integer_division, reason = "the length is a power of two")]
    let pair_count = NonZero::new(len / 2).expect("guarded by length check above");

    let workers = config.workers().min(pair_count);
    let direction = config.direction();

    debug!(
        len,
        workers = workers.get(),
        ?direction,
        "parallel FFT starting"
    );

    bit_reverse_permute(data);

    let barrier = PhaseBarrier::with_backoff(workers, config.backoff());

    {
        let buffer = SharedBuffer::new(data);

        if workers.get() == 1 {
            run_stages(&buffer, &barrier, 0..pair_count.get(), direction);
        } else {
            run_parallel_stages(&buffer, &barrier, workers, config);
        }
    }

    if direction == Direction::Inverse {
        scale_by_len(data);
    }

    let stages = len.trailing_zeros();
    debug!(len, stages, "parallel FFT finished");

    Ok(())
}

fn run_parallel_stages(
    buffer: &SharedBuffer<'_>,
    barrier: &PhaseBarrier,
    workers: NonZero<usize>,
    config: &FftConfig,
) {
    #[expect(clippy::integer_division, reason = "the length is a power of two")]
    let pair_count = buffer.len() / 2;

    let direction = config.direction();

    let cores = if config.pins_workers() {
        core_affinity::get_core_ids().unwrap_or_default()
    } else {
        Vec::new()
    };

    run_workers(
        workers,
        |index| thread::Builder::new().name(format!("phase-fft-{index}")),
        |index| {
            if let Some(&core) = cores.get(index) {
                pin_current_thread(index, core);
            }

            let pairs = partition(pair_count, workers, index);

            trace!(
                index,
                start = pairs.start,
                end = pairs.end,
                "FFT worker started"
            );

            run_stages(buffer, barrier, pairs, direction);

            trace!(index, "FFT worker finished");
        },
    );
}

fn pin_current_thread(index: usize, core: CoreId) {
    if !core_affinity::set_for_current(core) {
        debug!(
            index,
            core = core.id,
            "failed to pin FFT worker, running unpinned"
        );
    }
}

/// Executes the butterflies of `pairs` in every stage, waiting for the other workers after each.
#[expect(
    clippy::arithmetic_side_effects,
    reason = "element indexes derived from pair indexes stay below the buffer length"
)]
#[expect(clippy::integer_division, reason = "stage lengths are powers of two")]
fn run_stages(
    buffer: &SharedBuffer<'_>,
    barrier: &PhaseBarrier,
    pairs: Range<usize>,
    direction: Direction,
) {
    let len = buffer.len();
    let mut stage_len = 2;

    while stage_len <= len {
        let half = stage_len / 2;
        let base_angle = direction.sign() * TAU / as_f64(stage_len);

        for pair in pairs.clone() {
            let group = pair / half;
            let offset = pair % half;
            let top = group * stage_len + offset;

            let twiddle = Complex64::from_polar(1.0, base_angle * as_f64(offset));

            // SAFETY: Within a stage, pair indices map one-to-one onto disjoint (top, bottom)
            // element pairs, all in bounds, and every worker owns a disjoint block of pair
            // indices. Accesses in different stages are ordered by the barrier wait below.
            unsafe {
                buffer.butterfly(top, top + half, twiddle);
            }
        }

        barrier.wait();

        stage_len <<= 1;
    }
}

fn check_length(len: usize) -> Result<()> {
    if len < 2 {
        return Err(Error::LengthTooSmall { len });
    }

    if !len.is_power_of_two() {
        return Err(Error::LengthNotPowerOfTwo { len });
    }

    Ok(())
}

#[expect(
    clippy::arithmetic_side_effects,
    reason = "scaling a complex value by a real factor cannot overflow"
)]
fn scale_by_len(data: &mut [Complex64]) {
    let factor = as_f64(data.len()).recip();

    for value in data {
        *value *= factor;
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "FFT lengths and indexes are far below 2^52, where f64 is still exact"
)]
fn as_f64(value: usize) -> f64 {
    value as f64
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use new_zealand::nz;
    use testing::with_watchdog;

    use super::*;
    use crate::{DEFAULT_TOLERANCE, test_signal, validate};

    fn impulse(len: usize) -> Vec<Complex64> {
        let mut data = vec![Complex64::new(0.0, 0.0); len];
        data[0] = Complex64::new(1.0, 0.0);
        data
    }

    #[test]
    fn bit_reverse_of_eight() {
        let mut data = (0..8)
            .map(|i| Complex64::new(f64::from(i), 0.0))
            .collect::<Vec<_>>();

        bit_reverse_permute(&mut data);

        let order = data.iter().map(|c| c.re).collect::<Vec<_>>();
        assert_eq!(order, vec![0.0, 4.0, 2.0, 6.0, 1.0, 5.0, 3.0, 7.0]);
    }

    #[test]
    fn bit_reverse_is_an_involution() {
        let original = test_signal(64);
        let mut data = original.clone();

        bit_reverse_permute(&mut data);
        bit_reverse_permute(&mut data);

        assert_eq!(data, original);
    }

    #[test]
    fn bit_reverse_tolerates_tiny_buffers() {
        let mut empty: [Complex64; 0] = [];
        bit_reverse_permute(&mut empty);

        let mut single = [Complex64::new(3.0, 0.0)];
        bit_reverse_permute(&mut single);
        assert_eq!(single[0], Complex64::new(3.0, 0.0));
    }

    #[test]
    #[should_panic]
    fn bit_reverse_rejects_odd_lengths() {
        let mut data = vec![Complex64::new(0.0, 0.0); 6];
        bit_reverse_permute(&mut data);
    }

    #[test]
    fn rejects_invalid_lengths() {
        let mut empty: Vec<Complex64> = Vec::new();
        assert!(matches!(
            serial_fft(&mut empty, Direction::Forward),
            Err(Error::LengthTooSmall { len: 0 })
        ));

        let mut one = vec![Complex64::new(1.0, 0.0)];
        assert!(matches!(
            parallel_fft(&mut one, &FftConfig::new()),
            Err(Error::LengthTooSmall { len: 1 })
        ));

        let mut twelve = vec![Complex64::new(1.0, 0.0); 12];
        assert!(matches!(
            parallel_fft(&mut twelve, &FftConfig::new()),
            Err(Error::LengthNotPowerOfTwo { len: 12 })
        ));
    }

    #[test]
    fn impulse_transforms_to_flat_spectrum() {
        let mut data = impulse(16);
        serial_fft(&mut data, Direction::Forward).unwrap();

        let flat = vec![Complex64::new(1.0, 0.0); 16];
        assert!(validate(&data, &flat, 1e-12).passed());
    }

    #[test]
    fn single_worker_matches_serial() {
        let signal = test_signal(256);

        let mut expected = signal.clone();
        serial_fft(&mut expected, Direction::Forward).unwrap();

        let mut actual = signal;
        parallel_fft(&mut actual, &FftConfig::new().with_workers(nz!(1))).unwrap();

        assert!(validate(&actual, &expected, DEFAULT_TOLERANCE).passed());
    }

    #[test]
    fn single_participant_stages_run_inline() {
        let signal = test_signal(64);

        let mut expected = signal.clone();
        serial_fft(&mut expected, Direction::Forward).unwrap();

        let mut actual = signal;
        bit_reverse_permute(&mut actual);

        let barrier = PhaseBarrier::new(nz!(1));

        {
            let buffer = SharedBuffer::new(&mut actual);
            run_stages(&buffer, &barrier, 0..32, Direction::Forward);
        }

        assert!(validate(&actual, &expected, DEFAULT_TOLERANCE).passed());

        // A group of one never needs a release.
        assert_eq!(barrier.phase(), 0);
    }

    #[test]
    fn split_pairs_on_two_threads_match_serial() {
        with_watchdog(|| {
            let signal = test_signal(64);

            let mut expected = signal.clone();
            serial_fft(&mut expected, Direction::Forward).unwrap();

            let mut actual = signal;
            bit_reverse_permute(&mut actual);

            let barrier = PhaseBarrier::new(nz!(2));

            {
                let buffer = SharedBuffer::new(&mut actual);

                thread::scope(|s| {
                    s.spawn(|| run_stages(&buffer, &barrier, 0..16, Direction::Forward));
                    run_stages(&buffer, &barrier, 16..32, Direction::Forward);
                });
            }

            assert!(validate(&actual, &expected, DEFAULT_TOLERANCE).passed());

            // One release per stage of a 64-sample transform.
            assert_eq!(barrier.phase(), 6);
        });
    }

    #[test]
    fn two_samples_use_one_worker() {
        with_watchdog(|| {
            // One butterfly pair, so even a large worker count collapses to a single worker.
            let mut data = vec![Complex64::new(1.0, 0.0), Complex64::new(3.0, 0.0)];
            parallel_fft(&mut data, &FftConfig::new().with_workers(nz!(16))).unwrap();

            let expected = [Complex64::new(4.0, 0.0), Complex64::new(-2.0, 0.0)];
            assert!(validate(&data, &expected, 1e-12).passed());
        });
    }

    #[test]
    fn inverse_undoes_forward() {
        with_watchdog(|| {
            let signal = test_signal(128);

            let mut data = signal.clone();
            let config = FftConfig::new().with_workers(nz!(4));

            parallel_fft(&mut data, &config).unwrap();
            parallel_fft(&mut data, &config.with_direction(Direction::Inverse)).unwrap();

            assert!(validate(&data, &signal, DEFAULT_TOLERANCE).passed());
        });
    }
}
