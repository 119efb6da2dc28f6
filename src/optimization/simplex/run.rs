//! Execution helper that runs an `argmin` Nelder-Mead solver on an adapted
//! candidate receiver and returns a crate-friendly [`OptimOutcome`].

use argmin::core::{Executor, State};
use argmin::solver::neldermead::NelderMead;

use crate::optimization::{
    errors::OptResult,
    simplex::{
        adapter::SimplexAdapter,
        traits::{CandidateUpdate, OptimOutcome, SimplexOptions},
    },
};

/// Run the simplex solver to completion.
///
/// Wires the adapted problem and a fully constructed solver into an argmin
/// executor, caps the iteration count from `opts`, executes, and normalizes
/// the terminal state into an [`OptimOutcome`]. The receiver inside the
/// adapter has already absorbed every accepted candidate by the time this
/// returns; the outcome reports the best vertex the solver observed.
///
/// # Errors
/// - Propagates argmin runtime errors through the crate's
///   `From<argmin::core::Error>` conversion.
/// - Propagates validation errors from [`OptimOutcome::new`].
pub fn run_simplex<P>(
    problem: SimplexAdapter<P>, solver: NelderMead<Vec<f64>, f64>, opts: &SimplexOptions,
) -> OptResult<OptimOutcome>
where
    P: CandidateUpdate,
{
    let executor = Executor::new(problem, solver).configure(|state| state.max_iters(opts.max_iter));

    let result = executor.run()?;
    let mut state = result.state;
    let iterations = state.get_iter();
    let termination = state.get_termination_status().clone();
    let best_cost = state.get_best_cost();
    OptimOutcome::new(state.take_best_param(), best_cost, termination, iterations)
}
