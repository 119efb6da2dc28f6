//! High-level entry point for derivative-free local search over a candidate
//! receiver.

use crate::optimization::{
    errors::OptResult,
    simplex::{
        adapter::SimplexAdapter,
        builders::build_nelder_mead,
        run::run_simplex,
        traits::{CandidateUpdate, OptimOutcome, SimplexOptions},
    },
};

/// Minimize the cost reported by a [`CandidateUpdate`] receiver, starting
/// from the seed vertex `theta0`.
///
/// # Behavior
/// - Builds the initial simplex around `theta0` (5% coordinate
///   perturbations, absolute step for zero coordinates).
/// - Wraps the receiver in a [`SimplexAdapter`] so every vertex the solver
///   proposes is routed through the receiver's own transition.
/// - Runs Nelder-Mead with the configured iteration cap and cost-spread
///   tolerance, then normalizes the terminal state.
///
/// The receiver is borrowed for the duration of the run and has absorbed
/// every accepted candidate when this returns; callers typically apply the
/// returned best vertex through one more explicit transition.
///
/// # Errors
/// - Seed/builder validation errors.
/// - Runtime errors from the solver or the receiver, already converted into
///   [`crate::optimization::errors::OptError`].
pub fn minimize<P: CandidateUpdate>(
    problem: P, theta0: &[f64], opts: &SimplexOptions,
) -> OptResult<OptimOutcome> {
    let solver = build_nelder_mead(theta0, opts)?;
    let adapter = SimplexAdapter::new(problem);
    run_simplex(adapter, solver, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult as Res;

    /// A shifted quadratic bowl with an acceptance gate mimicking the model
    /// layer: candidates only move the internal state when they improve it.
    struct Bowl {
        center: Vec<f64>,
        accepted_cost: f64,
    }

    impl Bowl {
        fn cost_at(&self, theta: &[f64]) -> f64 {
            theta
                .iter()
                .zip(self.center.iter())
                .map(|(t, c)| (t - c) * (t - c))
                .sum()
        }
    }

    impl CandidateUpdate for Bowl {
        fn propose(&mut self, theta: &[f64]) -> Res<f64> {
            let cost = self.cost_at(theta);
            if cost < self.accepted_cost {
                self.accepted_cost = cost;
            }
            Ok(cost)
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the solver walks a quadratic bowl to its center and that the
    // receiver's accepted state tracks the best candidate seen.
    //
    // Given
    // -----
    // - A bowl centered at (1.5, -2.0), seeded from (4.0, 3.0).
    //
    // Expect
    // ------
    // - The best vertex lands within 1e-2 of the center.
    fn minimize_walks_a_quadratic_bowl_to_its_center() {
        let bowl = Bowl { center: vec![1.5, -2.0], accepted_cost: f64::INFINITY };
        let opts = SimplexOptions { max_iter: 300, sd_tolerance: 1e-10 };

        let outcome = minimize(bowl, &[4.0, 3.0], &opts).unwrap();

        assert!(outcome.cost < 1e-4, "cost {} did not converge", outcome.cost);
        assert!((outcome.theta[0] - 1.5).abs() < 1e-2, "theta0 = {}", outcome.theta[0]);
        assert!((outcome.theta[1] + 2.0).abs() < 1e-2, "theta1 = {}", outcome.theta[1]);
        assert!(outcome.iterations > 0);
    }

    #[test]
    // Purpose
    // -------
    // Verify the iteration cap is honored.
    fn minimize_respects_the_iteration_cap() {
        let bowl = Bowl { center: vec![100.0], accepted_cost: f64::INFINITY };
        let opts = SimplexOptions { max_iter: 3, sd_tolerance: 1e-12 };

        let outcome = minimize(bowl, &[0.0], &opts).unwrap();
        assert!(outcome.iterations <= 3);
    }
}
