//! kinetics — per-gene splicing-kinetics recovery.
//!
//! Purpose
//! -------
//! Recover a small kinetic model per gene from two paired abundance signals:
//! transcription, splicing, and degradation rates, a latent switching time,
//! and a per-observation latent time assignment, estimated by an EM-like
//! loop that alternates latent-time assignment with derivative-free
//! parameter refinement.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the data containers, parameter state, trajectory
//!   formulas, time assignment, trace, options, and validation helpers.
//! - [`models`] builds the fitting state machine ([`models::KineticModel`])
//!   on top, including the switching-time escape heuristic and the
//!   differential kinetics likelihood-ratio test.
//!
//! Invariants & assumptions
//! ------------------------
//! - Accepted losses are non-increasing up to the bounded switching-time
//!   escape; rates stay non-negative through candidate validation.
//! - Degenerate genes surface as a recoverability flag, never as a panic or
//!   a propagated error past the model boundary.
//!
//! Downstream usage
//! ----------------
//! - `recovery` schedules one model per gene over an execution engine and
//!   folds the snapshots into gene-indexed tables.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    AssignmentMode, FitTrace, GeneProfile, KineticParams, ParamUpdate, RecoveryOptions,
    TimeAssignment,
};
pub use self::errors::{KineticError, KineticResult};
pub use self::models::{DifferentialKinetics, KineticModel, UpdateOutcome};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::core::{
        AssignmentMode, FitTrace, GeneProfile, KineticParams, ParamUpdate, RecoveryOptions,
        TimeAssignment,
    };
    pub use super::models::{DifferentialKinetics, KineticModel, UpdateOutcome};
}
