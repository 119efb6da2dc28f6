//! Sequential task execution without parallelism.
//!
//! A thin wrapper around a loop: fully deterministic, tasks processed and
//! collected in order, with incremental progress reporting.

use crate::engine::{Collect, Progress, errors::EngineResult};

pub(crate) fn run_sequential<T, W, R>(tasks: &[T], work: &W, result: &mut R) -> EngineResult<()>
where
    W: Fn(&T) -> R::Output,
    R: Collect,
{
    let mut progress = Progress::new(tasks.len());
    for task in tasks {
        let output = work(task);
        result.collect(output);
        progress.step();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink {
        outputs: Vec<usize>,
    }

    impl Collect for Sink {
        type Output = usize;

        fn collect(&mut self, output: usize) {
            self.outputs.push(output);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify tasks run and collect in order, exactly once each.
    fn runs_tasks_in_order() {
        let tasks: Vec<usize> = (0..20).collect();
        let mut sink = Sink { outputs: Vec::new() };

        run_sequential(&tasks, &|&t| t * 2, &mut sink).unwrap();

        assert_eq!(sink.outputs, (0..20).map(|t| t * 2).collect::<Vec<_>>());
    }
}
