//! splice_kinetics — per-gene splicing-kinetics recovery over an execution
//! engine.
//!
//! Purpose
//! -------
//! Recover, per gene, a small kinetic model (transcription, splicing, and
//! degradation rates, a latent switching time, and a per-observation latent
//! time assignment) from two paired abundance signals, and scale the
//! embarrassingly-parallel-but-stateful fitting across many genes with a
//! worker pool coordinated by a shared claim counter and batched message
//! passing.
//!
//! Key behaviors
//! -------------
//! - [`kinetics`]: the per-gene iterative fitting state machine, an EM-like
//!   loop alternating latent-time assignment and derivative-free parameter
//!   refinement, with the accept/reject and switching-time escape rules
//!   that keep the optimization out of the collapsed-switch local optimum.
//! - [`optimization`]: the Nelder-Mead layer; every candidate vertex is an
//!   event routed through the model's update transition.
//! - [`statistical_tests`]: the bimodality screen consumed during
//!   initialization.
//! - [`engine`]: sequential and pooled task execution over a single-writer
//!   result sink.
//! - [`recovery`]: dataset input, gene-indexed aggregation, and the
//!   [`recovery::recover_dynamics`] entry point.
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-gene fits are statistically and computationally independent;
//!   correctness never depends on result arrival order.
//! - Accepted losses are non-increasing up to the bounded switching-time
//!   escape rule; rates stay non-negative by candidate validation.
//! - Task-local numerical failures are contained at the work boundary and
//!   logged; only pre-dispatch configuration failures abort a run.
//!
//! Downstream usage
//! ----------------
//! - Build an [`recovery::AbundanceDataset`] from smoothed abundance
//!   matrices, pick an [`engine::Engine`], and call
//!   [`recovery::recover_dynamics`]; the result carries the parameter
//!   table, fitted-time matrices, and the padded loss-trace matrix.
//! - For group-wise kinetics comparisons, fit a
//!   [`kinetics::KineticModel`] and call its
//!   [`differential_kinetic_test`](kinetics::KineticModel::differential_kinetic_test).

pub mod engine;
pub mod kinetics;
pub mod optimization;
pub mod recovery;
pub mod statistical_tests;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use splice_kinetics::prelude::*;
//
// to import the main recovery surface in a single line.

pub mod prelude {
    pub use crate::engine::{Collect, Engine, PoolOptions};
    pub use crate::kinetics::{
        AssignmentMode, KineticModel, KineticParams, ParamUpdate, RecoveryOptions,
    };
    pub use crate::recovery::{
        AbundanceDataset, GeneSelection, RecoveryResult, recover_dynamics,
    };
    pub use crate::statistical_tests::BimodalityOutcome;
}
