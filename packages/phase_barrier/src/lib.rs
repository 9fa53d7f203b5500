#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A reusable rendezvous point for a fixed group of worker threads.
//!
//! Multi-stage parallel computations (FFT butterfly stages, iterative solvers, simulation ticks)
//! need every worker to finish stage `n` before any worker starts stage `n + 1`. The
//! [`PhaseBarrier`] in this package provides that guarantee with the lowest practical latency:
//! workers that arrive early spin on a shared phase counter instead of parking in the operating
//! system, and the two counters the barrier mutates live on separate cache lines so arrivals do
//! not invalidate the line that waiters are polling.
//!
//! # Quick start
//!
//! ```rust
//! // examples/phase_barrier_readme.rs
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//!
//! use new_zealand::nz;
//! use phase_barrier::PhaseBarrier;
//!
//! let barrier = PhaseBarrier::new(nz!(4));
//! let arrivals = AtomicUsize::new(0);
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             for phase in 1..=3 {
//!                 arrivals.fetch_add(1, Ordering::Relaxed);
//!                 barrier.wait();
//!
//!                 // Every participant has contributed to this phase by now.
//!                 assert!(arrivals.load(Ordering::Relaxed) >= 4 * phase);
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(barrier.phase(), 3);
//! ```
//!
//! # Caller contract
//!
//! The barrier does not and cannot check who calls it. Every phase must be completed by exactly
//! [`threshold()`][PhaseBarrier::threshold] calls to [`wait()`][PhaseBarrier::wait]:
//!
//! * If fewer workers call `wait()`, the ones that did will spin forever.
//! * If more workers call `wait()`, the surplus callers are counted towards the next phase and
//!   the memory ordering guarantees no longer line up with the logical phases of the computation.
//!
//! Debug builds detect some (not all) violations of the second kind via a debug assertion.
//!
//! # Ownership
//!
//! The barrier is a plain value with no internal reference counting. The intended pattern is to
//! create it in the coordinating scope and lend `&PhaseBarrier` to workers started with
//! [`std::thread::scope`], which guarantees every worker has returned from its final `wait()`
//! before the barrier is dropped.
//!
//! # Tuning
//!
//! Waiters back off exponentially between polls of the phase counter. The spin budget is
//! configured via [`Backoff`]. The padding width is [`CACHE_LINE_SIZE`], chosen per target
//! architecture at compile time.

mod backoff;
mod barrier;
mod cache_padded;

pub use backoff::*;
pub use barrier::*;
pub use cache_padded::*;
