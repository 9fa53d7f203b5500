#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Runs the parallel FFT repeatedly, validating every run against the serial reference.
//!
//! Intended to be launched on a real or simulated multicore system to generate barrier-heavy
//! cross-core memory traffic. Set `RUST_LOG=debug` (or `trace`) for per-run and per-worker
//! detail.

use std::num::NonZero;
use std::process::ExitCode;
use std::time::Instant;

use argh::FromArgs;
use phase_barrier::Backoff;
use phase_fft::{
    Complex64, DEFAULT_TOLERANCE, Direction, Error, FftConfig, parallel_fft, serial_fft,
    test_signal, validate,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Stress a multicore memory hierarchy with a barrier-synchronized parallel FFT.
#[derive(FromArgs)]
struct Args {
    /// number of samples, a power of two (default 4096)
    #[argh(option, default = "4096")]
    size: usize,

    /// number of workers (default: one per available processor)
    #[argh(option)]
    workers: Option<NonZero<usize>>,

    /// number of times to run the transform (default 1)
    #[argh(option, default = "NonZero::<u32>::MIN")]
    trials: NonZero<u32>,

    /// also run the inverse transform and check that it restores the input
    #[argh(switch)]
    inverse: bool,

    /// pin each worker thread to its own processor
    #[argh(switch)]
    pin: bool,

    /// spin budget of the first back-off round of waiting workers
    #[argh(option)]
    initial_spins: Option<NonZero<u32>>,

    /// upper bound of the per-round spin budget of waiting workers
    #[argh(option)]
    max_spins: Option<NonZero<u32>>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
#[cfg_attr(coverage_nightly, coverage(off))]
fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Args = argh::from_env();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every trial passed validation.
#[cfg_attr(coverage_nightly, coverage(off))]
fn run(args: &Args) -> Result<bool, Error> {
    let config = config_from_args(args);

    let signal = test_signal(args.size);

    let mut reference = signal.clone();
    serial_fft(&mut reference, Direction::Forward)?;

    info!(
        size = args.size,
        workers = config.workers().get(),
        trials = args.trials.get(),
        inverse = args.inverse,
        "FFT stress run starting"
    );

    let mut failed_trials = Vec::new();

    for trial in 1..=args.trials.get() {
        if !run_trial(trial, &signal, &reference, &config, args.inverse)? {
            failed_trials.push(trial);
        }
    }

    let trials = args.trials.get();

    if failed_trials.is_empty() {
        println!(
            "✓ FFT passed ({trials} of {trials} trials, {} samples)",
            args.size
        );
    } else {
        warn!(?failed_trials, "some trials produced incorrect results");
        println!(
            "✗ FFT failed ({} of {trials} trials, {} samples)",
            failed_trials.len(),
            args.size
        );
    }

    Ok(failed_trials.is_empty())
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn run_trial(
    trial: u32,
    signal: &[Complex64],
    reference: &[Complex64],
    config: &FftConfig,
    inverse: bool,
) -> Result<bool, Error> {
    let mut data = signal.to_vec();

    let started = Instant::now();
    parallel_fft(&mut data, config)?;
    let elapsed = started.elapsed();

    let forward = validate(&data, reference, DEFAULT_TOLERANCE);
    info!(trial, ?elapsed, %forward, "forward transform");

    if !forward.passed() {
        warn!(
            trial,
            "forward transform does not match the serial reference"
        );
        return Ok(false);
    }

    if !inverse {
        return Ok(true);
    }

    parallel_fft(&mut data, &config.with_direction(Direction::Inverse))?;

    let round_trip = validate(&data, signal, DEFAULT_TOLERANCE);
    info!(trial, %round_trip, "inverse transform");

    if !round_trip.passed() {
        warn!(trial, "inverse transform does not restore the input");
    }

    Ok(round_trip.passed())
}

fn config_from_args(args: &Args) -> FftConfig {
    let mut config = FftConfig::new().with_pinned_workers(args.pin);

    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    if args.initial_spins.is_some() || args.max_spins.is_some() {
        config = config.with_backoff(Backoff::new(
            args.initial_spins.unwrap_or(Backoff::DEFAULT_INITIAL_SPINS),
            args.max_spins.unwrap_or(Backoff::DEFAULT_MAX_SPINS),
        ));
    }

    config
}
