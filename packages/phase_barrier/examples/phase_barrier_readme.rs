//! Four workers advance through three phases together. After each `wait()`, every worker can
//! rely on all four having contributed to the phase that just ended.
#![expect(
    clippy::arithmetic_side_effects,
    reason = "this is example code that doesn't need production-level safety"
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use new_zealand::nz;
use phase_barrier::PhaseBarrier;

fn main() {
    let barrier = PhaseBarrier::new(nz!(4));
    let arrivals = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..4 {
            let barrier = &barrier;
            let arrivals = &arrivals;

            s.spawn(move || {
                for phase in 1..=3 {
                    arrivals.fetch_add(1, Ordering::Relaxed);
                    barrier.wait();

                    let seen = arrivals.load(Ordering::Relaxed);
                    assert!(seen >= 4 * phase);

                    println!("worker {worker} finished phase {phase}, {seen} arrivals so far");
                }
            });
        }
    });

    println!("All workers completed {} phases.", barrier.phase());
}
