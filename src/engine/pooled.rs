//! Worker-pool task execution over a shared claim counter and a batched
//! result channel.
//!
//! Purpose
//! -------
//! Distribute independent tasks over a fixed set of long-lived workers. A
//! shared counter, advanced under mutual exclusion, hands each worker the
//! next batch of task indices; the worker executes every claimed task
//! outside the lock and pushes the whole batch of outputs as one message
//! onto a FIFO channel. The driver blocks on the channel and folds every
//! element of every received batch into the single-writer result until the
//! running total equals the task count, then joins the workers.
//!
//! Concurrency model
//! -----------------
//! - The claim counter is the only mutually exclusive shared resource; all
//!   other per-task state is private to the claiming worker until it
//!   crosses the channel.
//! - No ordering is guaranteed across batches or workers; the result's
//!   `collect` must be commutative over arrival order.
//! - There is no cancellation: a claimed batch runs to completion. Should
//!   every worker exit before all results arrived (a crashed worker), the
//!   closed channel surfaces as [`EngineError::ResultChannelClosed`] rather
//!   than a silent hang; per-task failures are expected to be converted
//!   into ordinary outputs at the work boundary and never reach this
//!   module.
//!
//! Batch size trades claim-lock contention against load imbalance under
//! heterogeneous per-task cost.

use std::sync::{Mutex, mpsc};
use std::thread;

use crate::engine::{
    Collect, PoolOptions, Progress,
    claim::claim_batch,
    errors::{EngineError, EngineResult},
};

pub(crate) fn run_pooled<T, W, R>(
    tasks: &[T], work: &W, result: &mut R, options: &PoolOptions,
) -> EngineResult<()>
where
    T: Sync,
    W: Fn(&T) -> R::Output + Sync,
    R: Collect,
    R::Output: Send,
{
    let total = tasks.len();
    let counter = Mutex::new(0usize);
    let (sender, receiver) = mpsc::channel::<Vec<R::Output>>();
    let mut progress = Progress::new(total);

    thread::scope(|scope| {
        for _ in 0..options.n_workers {
            let sender = sender.clone();
            let counter = &counter;
            scope.spawn(move || {
                while let Some(range) = claim_batch(counter, total, options.batch_size) {
                    let outputs: Vec<R::Output> = range.map(|ix| work(&tasks[ix])).collect();
                    // The driver only drops the receiver after all results
                    // arrived or on its own error path; either way this
                    // worker has nothing left to do.
                    if sender.send(outputs).is_err() {
                        break;
                    }
                }
            });
        }
        // The driver holds no sender; the channel closes once every worker
        // has exited.
        drop(sender);

        let mut done = 0usize;
        while done < total {
            match receiver.recv() {
                Ok(batch) => {
                    for output in batch {
                        result.collect(output);
                        done += 1;
                        progress.step();
                    }
                }
                Err(_) => {
                    return Err(EngineError::ResultChannelClosed { missing: total - done });
                }
            }
        }
        Ok(())
    })
}
