//! core — shared kinetics data, parameters, and trajectory primitives.
//!
//! Purpose
//! -------
//! Collect the building blocks of per-gene splicing-kinetics recovery: the
//! observed data container, the kinetic parameter state and its candidate
//! overlay, the closed-form two-branch trajectory and its inversions,
//! latent-time assignment, the accepted-state trace, recovery options, and
//! validation helpers. The model layer builds the fitting state machine on
//! top of these primitives.
//!
//! Key behaviors
//! -------------
//! - Define the per-gene data container ([`GeneProfile`]) with its weight
//!   mask, masked moments, and the recoverability precheck.
//! - Hold parameter state ([`KineticParams`]) and express candidate
//!   transitions as sparse overlays ([`ParamUpdate`]).
//! - Evaluate and invert the analytic induction/repression trajectory
//!   ([`trajectory`]) and assign latent times in projection or
//!   inverse-formula mode ([`assignment`]).
//! - Record accepted parameter/loss history ([`FitTrace`]) and carry the
//!   configuration surface ([`RecoveryOptions`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Signals are finite, non-negative reals; validation happens on container
//!   construction, so downstream numeric code can assume well-formed inputs.
//! - Resolved parameter candidates have non-negative finite rates and
//!   strictly positive switching time and scaling; invalid candidates are
//!   rejected at resolution, never clamped silently.
//! - The trace grows only through accepted updates and keeps exactly one
//!   loss per parameter snapshot.
//! - Modules here avoid I/O and logging; error conditions surface as
//!   `KineticResult` values.
//!
//! Downstream usage
//! ----------------
//! - `kinetics::models` drives fits over these primitives; `recovery`
//!   aggregates per-gene outputs into gene-indexed tables.

pub mod assignment;
pub mod data;
pub mod options;
pub mod params;
pub mod trace;
pub mod trajectory;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::assignment::{AssignmentMode, TimeAssignment, TrajectoryShape, assign_time};
pub use self::data::{GeneProfile, MIN_RECOVERABLE_OBS};
pub use self::options::RecoveryOptions;
pub use self::params::{KineticParams, ParamUpdate};
pub use self::trace::FitTrace;
pub use self::trajectory::{mrna, spliced, tau_inv, unspliced};
