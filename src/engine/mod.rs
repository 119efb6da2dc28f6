//! engine — generic task execution over a result-collecting sink.
//!
//! Purpose
//! -------
//! Abstract "apply this per-task work function to this list of tasks,
//! writing into this result object" behind a single contract with two
//! implementations: a deterministic single-threaded loop and a worker pool
//! coordinated by a shared claim counter with batched message passing. The
//! engine variant is chosen once at construction and never branched on per
//! task.
//!
//! Key behaviors
//! -------------
//! - [`Collect`]: the single-writer aggregation contract. The result object
//!   is the sole mutator of shared output state; `collect` must tolerate
//!   arbitrary call order, which holds by construction when each output is
//!   keyed by its own task identity.
//! - [`Engine::run`]: dispatches to the sequential loop or the pool.
//! - [`PoolOptions`]: validated worker count and batch size.
//!
//! Invariants & assumptions
//! ------------------------
//! - For any task count, batch size, and worker count, every task index is
//!   claimed exactly once across all workers (see [`claim`]).
//! - The work function is pure with respect to shared state: it returns
//!   everything of downstream interest in its output and mutates nothing
//!   observable, so sequential and pooled execution produce identical
//!   aggregated results.
//! - Per-task failures never cross the work boundary; the work function is
//!   expected to convert them into ordinary outputs.

pub mod claim;
pub mod errors;
pub mod pooled;
pub mod sequential;

pub use self::claim::claim_batch;
pub use self::errors::{EngineError, EngineResult};

/// Single-writer sink receiving task outputs in arbitrary order.
pub trait Collect {
    type Output: Send;

    /// Fold one task output into the aggregated result.
    fn collect(&mut self, output: Self::Output);
}

/// Worker-pool sizing, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub n_workers: usize,
    pub batch_size: usize,
}

impl PoolOptions {
    /// Construct validated pool options.
    ///
    /// # Errors
    /// - [`EngineError::InvalidWorkerCount`] if `n_workers == 0`.
    /// - [`EngineError::InvalidBatchSize`] if `batch_size == 0`.
    pub fn new(n_workers: usize, batch_size: usize) -> EngineResult<Self> {
        if n_workers == 0 {
            return Err(EngineError::InvalidWorkerCount { n_workers });
        }
        if batch_size == 0 {
            return Err(EngineError::InvalidBatchSize { batch_size });
        }
        Ok(PoolOptions { n_workers, batch_size })
    }
}

/// Execution strategy, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// In-order loop on the calling thread; fully deterministic.
    Sequential,
    /// Fixed worker pool over a shared claim counter and a batched result
    /// channel.
    Pooled(PoolOptions),
}

impl Engine {
    /// Convenience constructor: sequential for a single process, pooled
    /// otherwise.
    pub fn with_processes(n_procs: usize, batch_size: usize) -> EngineResult<Self> {
        if n_procs > 1 {
            Ok(Engine::Pooled(PoolOptions::new(n_procs, batch_size)?))
        } else {
            Ok(Engine::Sequential)
        }
    }

    /// Apply `work` to every element of `tasks`, folding each output into
    /// `result` via [`Collect::collect`].
    ///
    /// Outputs may arrive in any order under the pooled variant; the
    /// aggregated result must not depend on arrival order.
    ///
    /// # Errors
    /// - [`EngineError::ResultChannelClosed`] when every pool worker exited
    ///   before all results arrived.
    pub fn run<T, W, R>(&self, tasks: &[T], work: &W, result: &mut R) -> EngineResult<()>
    where
        T: Sync,
        W: Fn(&T) -> R::Output + Sync,
        R: Collect,
        R::Output: Send,
    {
        match self {
            Engine::Sequential => sequential::run_sequential(tasks, work, result),
            Engine::Pooled(options) => pooled::run_pooled(tasks, work, result, options),
        }
    }
}

/// Decile-step progress reporting through the logging facade.
pub(crate) struct Progress {
    total: usize,
    done: usize,
    next_report: usize,
}

impl Progress {
    pub(crate) fn new(total: usize) -> Self {
        let stride = ((total + 9) / 10).max(1);
        Progress { total, done: 0, next_report: stride }
    }

    pub(crate) fn step(&mut self) {
        self.done += 1;
        if self.done >= self.next_report || self.done == self.total {
            log::info!("processed {}/{} tasks", self.done, self.total);
            let stride = ((self.total + 9) / 10).max(1);
            self.next_report = (self.done + stride).min(self.total.max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink {
        seen: Vec<u32>,
    }

    impl Collect for Sink {
        type Output = u32;

        fn collect(&mut self, output: u32) {
            self.seen.push(output);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify both engine variants aggregate the same multiset of outputs.
    fn sequential_and_pooled_agree_on_aggregated_outputs() {
        let tasks: Vec<u32> = (0..101).collect();
        let work = |&t: &u32| t.wrapping_mul(17) ^ 3;

        let mut seq_sink = Sink { seen: Vec::new() };
        Engine::Sequential.run(&tasks, &work, &mut seq_sink).unwrap();

        let pooled = Engine::with_processes(4, 8).unwrap();
        let mut pool_sink = Sink { seen: Vec::new() };
        pooled.run(&tasks, &work, &mut pool_sink).unwrap();

        let mut a = seq_sink.seen;
        let mut b = pool_sink.seen;
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn process_count_of_one_selects_the_sequential_engine() {
        assert_eq!(Engine::with_processes(1, 10).unwrap(), Engine::Sequential);
        assert!(matches!(Engine::with_processes(4, 10).unwrap(), Engine::Pooled(_)));
    }

    #[test]
    fn pool_options_reject_zero_sizes() {
        assert!(PoolOptions::new(0, 1).is_err());
        assert!(PoolOptions::new(1, 0).is_err());
    }
}
