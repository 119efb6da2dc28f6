//! models — the per-gene fitting state machine and its diagnostics.

pub mod diff_kinetics;
pub mod recovery;

pub use self::diff_kinetics::{DifferentialKinetics, MIN_GROUP_OBS};
pub use self::recovery::{KineticModel, SWITCH_EXTENSION_TOL, UpdateOutcome};
