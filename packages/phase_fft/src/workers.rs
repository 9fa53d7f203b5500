use std::num::NonZero;
use std::sync::mpsc;
use std::thread;

/// Runs `work(index)` for every `index` in `0..count`, each on its own scoped thread created
/// from `builder(index)`, and returns once all of them have finished.
///
/// No thread starts working until every thread has been spawned. Work that meets at a barrier
/// sized for `count` participants therefore never starts with part of the group missing.
///
/// # Panics
///
/// Panics if a thread cannot be spawned. The threads spawned before the failure exit without
/// calling `work`, so the panic is raised instead of leaving them waiting for the missing
/// participants.
///
/// Panics if `work` panics on any thread.
pub(crate) fn run_workers<B, W>(count: NonZero<usize>, builder: B, work: W)
where
    B: Fn(usize) -> thread::Builder,
    W: Fn(usize) + Sync,
{
    let work = &work;

    thread::scope(|s| {
        let mut start_signals = Vec::with_capacity(count.get());

        for index in 0..count.get() {
            let (start_tx, start_rx) = mpsc::sync_channel::<()>(1);

            let spawned = builder(index).spawn_scoped(s, move || {
                // A disconnected channel means the group was abandoned before it started.
                if start_rx.recv().is_ok() {
                    work(index);
                }
            });

            if let Err(error) = spawned {
                // Disconnects every start channel, letting the spawned threads exit.
                drop(start_signals);
                panic!("failed to spawn worker thread {index} of {count}: {error}");
            }

            start_signals.push(start_tx);
        }

        for start_tx in start_signals {
            start_tx
                .send(())
                .expect("worker thread holds its start receiver until it has been signaled");
        }
    });
}
