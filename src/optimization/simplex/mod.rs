//! simplex — argmin-powered derivative-free local search.
//!
//! Purpose
//! -------
//! Provide the optimization layer of the per-gene fitting state machine.
//! The model layer implements a single trait, [`CandidateUpdate`], and
//! invokes [`minimize`] to run a Nelder-Mead search in which **every
//! candidate vertex the solver proposes is routed through the receiver's
//! own update transition** before its cost is reported back. The optimizer
//! therefore acts as a candidate-event emitter; acceptance authority stays
//! with the receiver, which keeps the interaction testable independent of
//! the solver.
//!
//! Key behaviors
//! -------------
//! - Seed an initial simplex around the current parameter vector
//!   ([`builders`]), 5% per-coordinate perturbations with an absolute
//!   fallback at zero.
//! - Bridge the receiver into argmin's `CostFunction` via interior
//!   mutability ([`adapter`]).
//! - Execute the solver with a per-stage iteration cap and cost-spread
//!   tolerance ([`run`]) and normalize results into [`OptimOutcome`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Costs are finite or `+inf`; NaN costs abort the run with
//!   [`errors::OptError::NanCost`](crate::optimization::errors::OptError).
//! - Configuration is validated on construction ([`SimplexOptions::new`]);
//!   the solver layer treats it as internally consistent.
//! - Errors bubble up as [`crate::optimization::errors::OptResult`]; this
//!   module never intentionally panics.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::traits::{CandidateUpdate, OptimOutcome, SimplexOptions};
