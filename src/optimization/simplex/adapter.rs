//! Adapter that exposes a [`CandidateUpdate`] receiver as an `argmin`
//! problem.
//!
//! The receiver mutates its own state on accepted candidates, while argmin's
//! `CostFunction::cost` takes `&self`; a `RefCell` bridges the two. The
//! executor drives the solver on a single thread, so the interior borrow is
//! never contended.

use std::cell::RefCell;

use argmin::core::{CostFunction, Error};

use crate::optimization::{errors::OptError, simplex::traits::CandidateUpdate};

/// Bridges a [`CandidateUpdate`] receiver to argmin's `CostFunction`.
///
/// Every cost evaluation forwards the proposed vertex to the receiver and
/// reports the candidate's cost back to the solver. NaN costs are turned
/// into an error; infinite costs pass through and mark the vertex as
/// maximally unattractive.
pub struct SimplexAdapter<P: CandidateUpdate> {
    inner: RefCell<P>,
}

impl<P: CandidateUpdate> SimplexAdapter<P> {
    /// Wrap a receiver for the duration of one solver run.
    pub fn new(inner: P) -> Self {
        SimplexAdapter { inner: RefCell::new(inner) }
    }

    /// Unwrap the receiver after the run.
    pub fn into_inner(self) -> P {
        self.inner.into_inner()
    }
}

impl<P: CandidateUpdate> CostFunction for SimplexAdapter<P> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let cost = self.inner.borrow_mut().propose(theta)?;
        if cost.is_nan() {
            return Err(OptError::NanCost.into());
        }
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;

    /// Records every proposed vertex; cost is the squared norm.
    struct Recorder {
        proposals: Vec<Vec<f64>>,
    }

    impl CandidateUpdate for Recorder {
        fn propose(&mut self, theta: &[f64]) -> OptResult<f64> {
            self.proposals.push(theta.to_vec());
            Ok(theta.iter().map(|v| v * v).sum())
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify every cost evaluation reaches the receiver exactly once and
    // the returned cost matches the receiver's value.
    fn cost_forwards_each_candidate_to_the_receiver() {
        let adapter = SimplexAdapter::new(Recorder { proposals: Vec::new() });

        let c1 = adapter.cost(&vec![3.0, 4.0]).unwrap();
        let c2 = adapter.cost(&vec![1.0, 0.0]).unwrap();

        assert_eq!(c1, 25.0);
        assert_eq!(c2, 1.0);
        let recorder = adapter.into_inner();
        assert_eq!(recorder.proposals, vec![vec![3.0, 4.0], vec![1.0, 0.0]]);
    }

    struct NanCost;

    impl CandidateUpdate for NanCost {
        fn propose(&mut self, _theta: &[f64]) -> OptResult<f64> {
            Ok(f64::NAN)
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify NaN costs abort instead of poisoning the simplex ordering.
    fn nan_costs_become_errors() {
        let adapter = SimplexAdapter::new(NanCost);
        assert!(adapter.cost(&vec![0.0]).is_err());
    }
}
