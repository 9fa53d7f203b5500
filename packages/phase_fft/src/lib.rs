#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Parallel radix-2 FFT whose butterfly stages are separated by a [`PhaseBarrier`].
//!
//! The transform exists to generate a specific memory access pattern: a fixed group of workers,
//! one per processor, each rewriting its own block of butterfly pairs in a shared buffer and then
//! meeting all other workers at a barrier before the next stage. Every stage shuffles which
//! elements each worker touches, so cache lines migrate between processors at every barrier.
//! This makes it a convenient stress test for both the barrier and the memory hierarchy.
//!
//! The parallel result is validated against a serial reference implementation.
//!
//! # Example
//!
//! ```
//! use new_zealand::nz;
//! use phase_fft::{DEFAULT_TOLERANCE, FftConfig, parallel_fft, serial_fft, test_signal, validate};
//!
//! let signal = test_signal(1024);
//!
//! let mut reference = signal.clone();
//! serial_fft(&mut reference, phase_fft::Direction::Forward).unwrap();
//!
//! let mut result = signal;
//! parallel_fft(&mut result, &FftConfig::new().with_workers(nz!(4))).unwrap();
//!
//! assert!(validate(&result, &reference, DEFAULT_TOLERANCE).passed());
//! ```
//!
//! [`PhaseBarrier`]: phase_barrier::PhaseBarrier

mod config;
mod error;
mod partition;
mod shared_buffer;
mod transform;
mod validation;
mod workers;

pub use config::*;
pub use error::*;
pub use partition::*;
pub(crate) use shared_buffer::SharedBuffer;
pub use transform::*;
pub use validation::*;
pub(crate) use workers::run_workers;

/// Element type of all transforms in this package.
pub use num_complex::Complex64;
