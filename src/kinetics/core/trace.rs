//! Accepted-state history of a fit.
//!
//! The trace records every accepted parameter snapshot alongside its loss,
//! strictly one loss per snapshot, appended only on accepted updates. The
//! loss sequence is the object the acceptance rules are judged against: it
//! is non-increasing except where the switching-time extension heuristic
//! permits a bounded relative increase.

use crate::kinetics::core::params::KineticParams;

/// Append-only parameter/loss history of accepted updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitTrace {
    params: Vec<KineticParams>,
    losses: Vec<f64>,
}

impl FitTrace {
    pub fn new() -> Self {
        FitTrace::default()
    }

    /// Append an accepted snapshot and its loss.
    pub fn push(&mut self, params: KineticParams, loss: f64) {
        self.params.push(params);
        self.losses.push(loss);
    }

    /// Loss of the most recently accepted state.
    pub fn last_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    /// Most recently accepted parameter snapshot.
    pub fn last_params(&self) -> Option<&KineticParams> {
        self.params.last()
    }

    /// Number of accepted states.
    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    /// Accepted losses in acceptance order.
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    /// Accepted parameter snapshots in acceptance order.
    pub fn params(&self) -> &[KineticParams] {
        &self.params
    }
}
